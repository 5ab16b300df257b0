use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Status code used when the scheduler reported a state outside the known set.
pub const NOT_PROVIDED: i64 = 99_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineStatus {
    Ok,
    Warning,
    Down,
}

impl EngineStatus {
    pub fn code(self) -> i64 {
        match self {
            EngineStatus::Ok => 0,
            EngineStatus::Warning => 1,
            EngineStatus::Down => 2,
        }
    }

    /// Classifies a numeric status. [`NOT_PROVIDED`] and any other unknown
    /// code are rejected rather than defaulted.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(EngineStatus::Ok),
            1 => Ok(EngineStatus::Warning),
            2 => Ok(EngineStatus::Down),
            other => Err(GridError::UnrecognizedStatus(other)),
        }
    }

    /// Maps a controller state word to a status code: `UP` is 0, `DOWN` is 2,
    /// anything else (other casings included) is [`NOT_PROVIDED`].
    pub fn code_for_word(word: &str) -> i64 {
        match word {
            "UP" => EngineStatus::Ok.code(),
            "DOWN" => EngineStatus::Down.code(),
            _ => NOT_PROVIDED,
        }
    }

    /// Same mapping for a partition `AVAIL` column, which sinfo prints in
    /// lower case.
    pub fn code_for_avail(avail: &str) -> i64 {
        match avail {
            "up" => EngineStatus::Ok.code(),
            "down" => EngineStatus::Down.code(),
            _ => NOT_PROVIDED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    pub code: i64,
    pub status: EngineStatus,
    pub info: String,
}

impl StatusInfo {
    pub fn new(code: i64, info: String) -> Result<Self> {
        Ok(Self {
            code,
            status: EngineStatus::from_code(code)?,
            info,
        })
    }
}

/// Scheduler health snapshot; timestamps are scheduler-local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckInfo {
    pub status_info: StatusInfo,
    pub start_time: NaiveDateTime,
    pub check_time: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_mapping_is_total() {
        assert_eq!(EngineStatus::code_for_word("UP"), 0);
        assert_eq!(EngineStatus::code_for_word("DOWN"), 2);
        assert_eq!(EngineStatus::code_for_word("DRAINING"), NOT_PROVIDED);
        assert_eq!(EngineStatus::code_for_word(""), NOT_PROVIDED);
    }

    #[test]
    fn state_words_match_case_exactly() {
        assert_eq!(EngineStatus::code_for_word("down"), NOT_PROVIDED);
        assert_eq!(EngineStatus::code_for_word("Up"), NOT_PROVIDED);
        assert_eq!(EngineStatus::code_for_avail("up"), 0);
        assert_eq!(EngineStatus::code_for_avail("down"), 2);
        assert_eq!(EngineStatus::code_for_avail("UP"), NOT_PROVIDED);
    }

    #[test]
    fn sentinel_is_not_a_status() {
        assert!(matches!(
            EngineStatus::from_code(NOT_PROVIDED),
            Err(GridError::UnrecognizedStatus(NOT_PROVIDED))
        ));
        assert_eq!(EngineStatus::from_code(0).unwrap(), EngineStatus::Ok);
        assert_eq!(EngineStatus::from_code(2).unwrap(), EngineStatus::Down);
    }
}
