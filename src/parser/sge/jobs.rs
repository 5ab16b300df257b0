use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::cmd::CommandResult;
use crate::entity::{DeletedJobInfo, Job, JobState};
use crate::error::{GridError, OutputError, Result};
use crate::parser::fields::{content_lines, parse_value, split_columns};
use crate::parser::require_success;

const QSTAT: &str = "qstat";
const QSUB: &str = "qsub";
const QDEL: &str = "qdel";

/// id, prior, name, user, state, date, time, [queue], slots, [ja-task-ID]
const QSTAT_MIN_COLUMNS: usize = 8;
const QSTAT_MAX_COLUMNS: usize = 10;
const QSTAT_TIME_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

const SUBMITTED_JOB: &str = r"Your job(-array)? (\d+)";
const DELETED_JOB: &str = r"^(\S+) has (?:registered the job|deleted job) (\d+)";
const DENIED_JOB: &str = r#"denied: job "?(\d+)"? does not exist"#;

static SUBMITTED_JOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SUBMITTED_JOB).expect("submission pattern is valid"));
static DELETED_JOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DELETED_JOB).expect("deletion pattern is valid"));
static DENIED_JOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DENIED_JOB).expect("denial pattern is valid"));

fn is_table_decoration(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("job-ID") || trimmed.starts_with("---")
}

/// Parse the default `qstat` table.
pub fn parse_job_listing(result: &CommandResult) -> Result<Vec<Job>> {
    require_success(result, QSTAT)?;
    content_lines(&result.std_out)
        .filter(|line| !is_table_decoration(line))
        .map(parse_job_line)
        .collect()
}

fn parse_job_line(line: &str) -> Result<Job> {
    let columns = split_columns(line, QSTAT_MIN_COLUMNS, QSTAT_MAX_COLUMNS)?;
    let submitted = format!("{} {}", columns[5], columns[6]);
    let submitted_at = NaiveDateTime::parse_from_str(&submitted, QSTAT_TIME_FORMAT).map_err(|_| {
        OutputError::InvalidValue {
            field: "submit/start at".to_string(),
            value: submitted.clone(),
        }
    })?;
    let (queue, slots) = if columns[7].contains('@') {
        let queue = columns[7].split('@').next().unwrap_or_default();
        let slots = columns.get(8).ok_or_else(|| OutputError::ColumnCount {
            min: QSTAT_MIN_COLUMNS + 1,
            max: QSTAT_MAX_COLUMNS,
            actual: columns.len(),
            line: line.to_string(),
        })?;
        (Some(queue.to_string()), *slots)
    } else {
        (None, columns[7])
    };

    Ok(Job {
        id: parse_value("job-ID", columns[0])?,
        name: Some(columns[2].to_string()),
        owner: Some(columns[3].to_string()),
        state: JobState::from_sge(columns[4]),
        queue,
        submitted_at: Some(submitted_at),
        slots: Some(parse_value("slots", slots)?),
    })
}

/// Parse the id from `Your job 12 ("name") has been submitted`.
pub fn parse_submission(result: &CommandResult) -> Result<Job> {
    result.ensure_success(QSUB)?;
    let line = result.std_out.first().ok_or_else(|| OutputError::Empty {
        what: "submission confirmation".to_string(),
    })?;
    let id = SUBMITTED_JOB_RE
        .captures(line)
        .and_then(|caps| caps.get(2))
        .ok_or_else(|| OutputError::Unmatched {
            pattern: SUBMITTED_JOB.to_string(),
            line: line.clone(),
        })?;
    Ok(Job::submitted(parse_value("job id", id.as_str())?))
}

/// Parse `qdel` confirmations. SGE writes them to either stream, and takes
/// the owner from each line.
pub fn parse_deletion(result: &CommandResult) -> Result<Vec<DeletedJobInfo>> {
    result.ensure_success(QDEL)?;
    let lines: Vec<&str> = content_lines(&result.std_out)
        .chain(content_lines(&result.std_err))
        .collect();

    let denied: HashSet<&str> = lines
        .iter()
        .filter_map(|line| DENIED_JOB_RE.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    let mut deleted: Vec<DeletedJobInfo> = Vec::new();
    for line in &lines {
        let Some(caps) = DELETED_JOB_RE.captures(line) else {
            continue;
        };
        let (Some(owner), Some(id)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if denied.contains(id.as_str()) {
            continue;
        }
        let id: u64 = parse_value("job id", id.as_str())?;
        if deleted.iter().any(|d| d.id == id) {
            continue;
        }
        deleted.push(DeletedJobInfo {
            id,
            owner: owner.as_str().to_string(),
        });
    }

    if deleted.is_empty() {
        return Err(GridError::NotFound(format!(
            "No jobs were deleted: {}",
            lines.join("\n")
        )));
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_with_and_without_queue() {
        let result = CommandResult::new(
            0,
            [
                "job-ID  prior   name       user         state submit/start at     queue                          slots ja-task-ID",
                "-----------------------------------------------------------------------------------------------------------------",
                "      1 0.55500 sleep      sgeuser      r     03/01/2024 10:15:00 all.q@worker1                      2",
                "      2 0.00000 sleep      sgeuser      qw    03/01/2024 10:16:00                                    1",
            ],
            Vec::<String>::new(),
        );
        let jobs = parse_job_listing(&result).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].queue.as_deref(), Some("all.q"));
        assert_eq!(jobs[0].slots, Some(2));
        assert!(matches!(jobs[0].state, JobState::Running(_)));
        assert_eq!(jobs[1].queue, None);
        assert!(matches!(jobs[1].state, JobState::Pending(_)));
    }

    #[test]
    fn array_submission() {
        let result = CommandResult::new(
            0,
            [r#"Your job-array 42.1-10:1 ("sweep") has been submitted"#],
            Vec::<String>::new(),
        );
        assert_eq!(parse_submission(&result).unwrap().id, 42);
    }

    #[test]
    fn deletion_reads_both_streams() {
        let result = CommandResult::new(
            0,
            ["sgeuser has registered the job 7 for deletion"],
            ["admin has deleted job 8", r#"denied: job "9" does not exist"#],
        );
        let deleted = parse_deletion(&result).unwrap();
        assert_eq!(deleted.len(), 2);
        assert_eq!(deleted[0].owner, "sgeuser");
        assert_eq!(deleted[1].id, 8);
    }

    #[test]
    fn only_denials_is_not_found() {
        let result = CommandResult::new(0, Vec::<String>::new(), [r#"denied: job "9" does not exist"#]);
        assert!(matches!(parse_deletion(&result), Err(GridError::NotFound(_))));
    }
}
