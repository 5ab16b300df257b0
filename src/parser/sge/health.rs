use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::cmd::CommandResult;
use crate::entity::{HealthCheckInfo, StatusInfo};
use crate::error::{OutputError, Result};
use crate::parser::check_health_response;
use crate::parser::fields::{parse_value, squash_whitespace};

const QPING: &str = "qping";

const CHECK_TIME_FORMAT: &str = "%m/%d/%Y %H:%M:%S:";
const START_TIME_FORMAT: &str = "%m/%d/%Y %H:%M:%S";
const STATUS: &str = "status";
const INFO: &str = "info";
const START_TIME: &str = "start time";

fn parse_time(field: &str, raw: &str, format: &str) -> std::result::Result<NaiveDateTime, OutputError> {
    NaiveDateTime::parse_from_str(raw, format).map_err(|_| OutputError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// Parse `qping -info <host> <port> qmaster 1`.
///
/// The first line is the check time (`03/01/2024 12:00:00:`); the rest are
/// `key: value` lines carrying `start time`, a numeric `status` and `info`.
pub fn parse_qping(result: &CommandResult) -> Result<HealthCheckInfo> {
    check_health_response(result, QPING)?;
    let (first, rest) = result
        .std_out
        .split_first()
        .ok_or_else(|| OutputError::Empty {
            what: "qping report".to_string(),
        })?;
    let check_time = parse_time("check time", first.trim(), CHECK_TIME_FORMAT)?;

    let entries: BTreeMap<&str, &str> = rest
        .iter()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect();
    let require = |key: &str| {
        entries
            .get(key)
            .copied()
            .ok_or_else(|| OutputError::MissingKey {
                key: key.to_string(),
                line: first.clone(),
            })
    };

    let start_raw = require(START_TIME)?;
    let start_text = start_raw.split(" (").next().unwrap_or_default().trim();
    let start_time = parse_time(START_TIME, start_text, START_TIME_FORMAT)?;
    let code: i64 = parse_value(STATUS, require(STATUS)?)?;
    let info = squash_whitespace(require(INFO)?);

    Ok(HealthCheckInfo {
        status_info: StatusInfo::new(code, info)?,
        start_time,
        check_time,
    })
}
