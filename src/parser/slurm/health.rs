//! Slurm controller health probes.
//!
//! All three probes share the same pre-checks (see
//! [`check_health_response`]) and differ in where the `UP`/`DOWN` word sits.
//! Only `scontrol show config` reports when the controller booted; the other
//! probes stamp both times with the moment of the check.

use chrono::NaiveDateTime;

use crate::cmd::CommandResult;
use crate::entity::{EngineStatus, HealthCheckInfo, StatusInfo};
use crate::error::{OutputError, Result};
use crate::parser::check_health_response;
use crate::parser::fields::{squash_whitespace, zip_header};

const SCONTROL: &str = "scontrol";
const SINFO: &str = "sinfo";

const BOOT_TIME: &str = "BOOT_TIME";
const BOOT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const AVAIL: &str = "AVAIL";

fn last_word(line: &str) -> &str {
    line.split_whitespace().last().unwrap_or_default()
}

/// `scontrol show config`: the closing line ends in `UP` or `DOWN`, and the
/// `BOOT_TIME = ...` entry gives the start time.
pub fn parse_show_config(result: &CommandResult, now: NaiveDateTime) -> Result<HealthCheckInfo> {
    check_health_response(result, SCONTROL)?;
    let status_line = result
        .std_out
        .iter()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(String::as_str)
        .unwrap_or_default();
    let code = EngineStatus::code_for_word(last_word(status_line));

    let boot_line = result
        .std_out
        .iter()
        .find(|line| line.trim_start().starts_with(BOOT_TIME))
        .ok_or_else(|| OutputError::MissingKey {
            key: BOOT_TIME.to_string(),
            line: status_line.to_string(),
        })?;
    let raw = boot_line
        .split_once('=')
        .map(|(_, value)| value.trim())
        .unwrap_or_default();
    let start_time = NaiveDateTime::parse_from_str(raw, BOOT_TIME_FORMAT).map_err(|_| {
        OutputError::InvalidValue {
            field: BOOT_TIME.to_string(),
            value: raw.to_string(),
        }
    })?;

    Ok(HealthCheckInfo {
        status_info: StatusInfo::new(code, squash_whitespace(status_line))?,
        start_time,
        check_time: now,
    })
}

/// `scontrol ping`: the first line ends in `UP` or `DOWN`.
pub fn parse_ping(result: &CommandResult, now: NaiveDateTime) -> Result<HealthCheckInfo> {
    check_health_response(result, SCONTROL)?;
    let first = result.std_out.first().map(String::as_str).unwrap_or_default();
    let code = EngineStatus::code_for_word(last_word(first));
    let info = result
        .std_out
        .iter()
        .find(|line| line.contains("UP") || line.contains("DOWN"))
        .map(|line| squash_whitespace(line))
        .ok_or_else(|| OutputError::Empty {
            what: "controller status".to_string(),
        })?;

    Ok(HealthCheckInfo {
        status_info: StatusInfo::new(code, info)?,
        start_time: now,
        check_time: now,
    })
}

/// `sinfo --summarize`: a header row and a value row; `AVAIL` is `up` or `down`.
pub fn parse_sinfo_summary(result: &CommandResult, now: NaiveDateTime) -> Result<HealthCheckInfo> {
    check_health_response(result, SINFO)?;
    let [header, values, ..] = result.std_out.as_slice() else {
        return Err(OutputError::Empty {
            what: "sinfo summary value row".to_string(),
        }
        .into());
    };
    let table = zip_header(header, values)?;
    let avail = table.get(AVAIL).ok_or_else(|| OutputError::MissingKey {
        key: AVAIL.to_string(),
        line: header.clone(),
    })?;
    let code = EngineStatus::code_for_avail(avail);
    let info = table
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");

    Ok(HealthCheckInfo {
        status_info: StatusInfo::new(code, info)?,
        start_time: now,
        check_time: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridError;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn stdout(lines: &[&str]) -> CommandResult {
        CommandResult::new(0, lines.iter().copied(), Vec::<String>::new())
    }

    #[test]
    fn show_config_reads_boot_time_and_status() {
        let result = stdout(&[
            "Configuration data as of 2024-03-01T11:59:59",
            "AccountingStorageType   = accounting_storage/none",
            "BOOT_TIME               = 2024-02-28T08:30:00",
            "ClusterName             = cluster",
            "",
            "Slurmctld(primary) at  head1  is UP",
        ]);
        let info = parse_show_config(&result, now()).unwrap();
        assert_eq!(info.status_info.code, 0);
        assert_eq!(info.status_info.status, EngineStatus::Ok);
        assert_eq!(info.status_info.info, "Slurmctld(primary) at head1 is UP");
        assert_eq!(info.start_time.to_string(), "2024-02-28 08:30:00");
        assert_eq!(info.check_time, now());
    }

    #[test]
    fn show_config_down_is_a_status_not_an_error() {
        let result = stdout(&[
            "BOOT_TIME = 2024-02-28T08:30:00",
            "Slurmctld(primary) at head1 is DOWN",
        ]);
        let info = parse_show_config(&result, now()).unwrap();
        assert_eq!(info.status_info.status, EngineStatus::Down);
        assert_eq!(info.status_info.code, 2);
    }

    #[test]
    fn unknown_status_word_is_unrecognized() {
        let result = stdout(&[
            "BOOT_TIME = 2024-02-28T08:30:00",
            "Slurmctld(primary) at head1 is DRAINING",
        ]);
        assert!(matches!(
            parse_show_config(&result, now()),
            Err(GridError::UnrecognizedStatus(99_999))
        ));
    }

    #[test]
    fn lower_case_status_word_is_unrecognized() {
        let result = stdout(&[
            "BOOT_TIME = 2024-02-28T08:30:00",
            "Slurmctld(primary) at head1 is down",
        ]);
        assert!(matches!(
            parse_show_config(&result, now()),
            Err(GridError::UnrecognizedStatus(99_999))
        ));
    }

    #[test]
    fn unreachable_controller() {
        let result = CommandResult::new(
            1,
            ["slurm_load_ctl_conf error: can't find connection"],
            ["Unable to contact slurm controller"],
        );
        assert!(matches!(
            parse_show_config(&result, now()),
            Err(GridError::Unreachable(_))
        ));
    }

    #[test]
    fn ping_uses_first_line() {
        let result = stdout(&["Slurmctld(primary) at head1 is UP"]);
        let info = parse_ping(&result, now()).unwrap();
        assert_eq!(info.status_info.status, EngineStatus::Ok);
        assert_eq!(info.start_time, now());
    }

    #[test]
    fn sinfo_summary_zips_header() {
        let result = stdout(&[
            "PARTITION AVAIL  TIMELIMIT   NODES(A/I/O/T) NODELIST",
            "debug*       up   infinite        0/2/0/2 n[1-2]",
        ]);
        let info = parse_sinfo_summary(&result, now()).unwrap();
        assert_eq!(info.status_info.status, EngineStatus::Ok);
        assert!(info.status_info.info.contains("AVAIL=up"));
    }

    #[test]
    fn sinfo_summary_down_partition() {
        let result = stdout(&[
            "PARTITION AVAIL  TIMELIMIT   NODES(A/I/O/T) NODELIST",
            "debug*     down   infinite        0/0/2/2 n[1-2]",
        ]);
        let info = parse_sinfo_summary(&result, now()).unwrap();
        assert_eq!(info.status_info.status, EngineStatus::Down);
    }

    #[test]
    fn sinfo_summary_needs_two_rows() {
        let result = stdout(&["PARTITION AVAIL"]);
        assert!(parse_sinfo_summary(&result, now()).unwrap_err().is_malformed_output());
    }
}
