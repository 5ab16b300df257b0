use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Scheduler-independent job state. Each variant keeps the scheduler's own
/// state code when one was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", content = "native", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending(Option<String>),
    Running(Option<String>),
    Suspended(Option<String>),
    Completed(Option<String>),
    Failed(Option<String>),
    Unknown(Option<String>),
}

impl JobState {
    pub fn native(&self) -> Option<&str> {
        match self {
            JobState::Pending(n)
            | JobState::Running(n)
            | JobState::Suspended(n)
            | JobState::Completed(n)
            | JobState::Failed(n)
            | JobState::Unknown(n) => n.as_deref(),
        }
    }

    /// Maps a Slurm `%T` state name.
    pub fn from_slurm(state: &str) -> Self {
        let native = Some(state.to_string());
        match state.trim().to_uppercase().as_str() {
            "PENDING" | "PD" | "REQUEUED" | "RQ" | "RESV_DEL_HOLD" => JobState::Pending(native),
            "RUNNING" | "R" | "COMPLETING" | "CG" | "CONFIGURING" | "CF" | "RESIZING" | "SIGNALING"
            | "STAGE_OUT" => JobState::Running(native),
            "SUSPENDED" | "S" | "STOPPED" | "ST" => JobState::Suspended(native),
            "COMPLETED" | "CD" => JobState::Completed(native),
            "FAILED" | "F" | "CANCELLED" | "CA" | "TIMEOUT" | "TO" | "NODE_FAIL" | "NF"
            | "OUT_OF_MEMORY" | "OOM" | "BOOT_FAIL" | "BF" | "DEADLINE" | "DL" | "PREEMPTED"
            | "PR" => JobState::Failed(native),
            _ => JobState::Unknown(native),
        }
    }

    /// Maps an SGE `qstat` state code such as `qw`, `r` or `Eqw`.
    pub fn from_sge(code: &str) -> Self {
        let native = Some(code.to_string());
        let has = |flags: &[char]| code.chars().any(|c| flags.contains(&c));
        if has(&['E']) {
            JobState::Failed(native)
        } else if has(&['s', 'S', 'T']) {
            JobState::Suspended(native)
        } else if has(&['r', 't']) {
            JobState::Running(native)
        } else if has(&['q', 'w', 'h']) {
            JobState::Pending(native)
        } else {
            JobState::Unknown(native)
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let category = match self {
            JobState::Pending(_) => "pending",
            JobState::Running(_) => "running",
            JobState::Suspended(_) => "suspended",
            JobState::Completed(_) => "completed",
            JobState::Failed(_) => "failed",
            JobState::Unknown(_) => "unknown",
        };
        match self.native() {
            Some(native) => write!(f, "{} ({})", category, native),
            None => write!(f, "{}", category),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub state: JobState,
    pub queue: Option<String>,
    pub submitted_at: Option<NaiveDateTime>,
    pub slots: Option<u32>,
}

impl Job {
    /// A job the scheduler has just accepted.
    pub fn submitted(id: u64) -> Self {
        Self {
            id,
            name: None,
            owner: None,
            state: JobState::Pending(None),
            queue: None,
            submitted_at: None,
            slots: None,
        }
    }
}

/// A job the scheduler confirmed it is terminating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedJobInfo {
    pub id: u64,
    pub owner: String,
}
