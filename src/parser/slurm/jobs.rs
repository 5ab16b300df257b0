use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::cmd::CommandResult;
use crate::entity::{DeletedJobInfo, Job, JobState};
use crate::error::{GridError, OutputError, Result};
use crate::parser::fields::{content_lines, parse_value, split_fields};

const SQUEUE: &str = "squeue";
const SBATCH: &str = "sbatch";
const SCANCEL: &str = "scancel";

/// `%i|%u|%T|%r|%j|%P|%V|%C`
const SQUEUE_FIELDS: usize = 8;
const SQUEUE_HEADER_LINES: usize = 1;
const SUBMIT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const INVALID_JOB_ID: &str = "Invalid job id specified";
const SUBMITTED_JOB: &str = r"Submitted batch job (\d+)";

static SUBMITTED_JOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SUBMITTED_JOB).expect("submission pattern is valid"));
const TERMINATING_PREFIX: &str = "scancel: Terminating job";
const KILL_ERROR_PREFIX: &str = "scancel: error: Kill job error on job id";

/// Parse a `squeue` listing.
///
/// A failed exit whose stderr only reports unknown job ids is an empty
/// listing: asking for ids that already left the queue is not an error.
pub fn parse_job_listing(result: &CommandResult) -> Result<Vec<Job>> {
    if !result.success() {
        let only_unknown_ids = !result.std_err.is_empty()
            && result.std_err.iter().all(|line| line.contains(INVALID_JOB_ID));
        if !only_unknown_ids {
            return Err(result.failure(SQUEUE));
        }
        tracing::warn!(stderr = %result.std_err.join("\n"), "Job ids not found, returning empty listing");
        return Ok(Vec::new());
    }
    if !result.std_err.is_empty() {
        tracing::warn!(stderr = %result.std_err.join("\n"), "squeue wrote to stderr");
    }

    result
        .std_out
        .iter()
        .skip(SQUEUE_HEADER_LINES)
        .map(String::as_str)
        .filter(|line| !line.trim().is_empty())
        .map(parse_job_line)
        .collect()
}

fn parse_job_line(line: &str) -> Result<Job> {
    let fields = split_fields(line, '|', SQUEUE_FIELDS)?;
    let submitted_at = match fields[6] {
        "" | "N/A" | "Unknown" => None,
        raw => Some(NaiveDateTime::parse_from_str(raw, SUBMIT_TIME_FORMAT).map_err(|_| {
            OutputError::InvalidValue {
                field: "submit time".to_string(),
                value: raw.to_string(),
            }
        })?),
    };
    Ok(Job {
        id: parse_value("job id", fields[0])?,
        owner: non_empty(fields[1]),
        state: JobState::from_slurm(fields[2]),
        name: non_empty(fields[4]),
        queue: non_empty(fields[5]),
        submitted_at,
        slots: Some(parse_value("cpus", fields[7])?),
    })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse the id `sbatch` assigned from its first stdout line.
pub fn parse_submission(result: &CommandResult) -> Result<Job> {
    result.ensure_success(SBATCH)?;
    let line = result.std_out.first().ok_or_else(|| OutputError::Empty {
        what: "submission confirmation".to_string(),
    })?;
    let id = SUBMITTED_JOB_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| OutputError::Unmatched {
            pattern: SUBMITTED_JOB.to_string(),
            line: line.clone(),
        })?;
    Ok(Job::submitted(parse_value("job id", id.as_str())?))
}

/// Parse `scancel --verbose` stderr into the jobs it confirmed terminating.
///
/// An id that also appears on a kill-error line is not deleted. No deleted
/// ids at all is `NotFound`.
pub fn parse_deletion(result: &CommandResult, owner: &str) -> Result<Vec<DeletedJobInfo>> {
    result.ensure_success(SCANCEL)?;

    let failed: HashSet<&str> = result
        .std_err
        .iter()
        .filter_map(|line| line.strip_prefix(KILL_ERROR_PREFIX))
        .filter_map(|rest| rest.split(':').next())
        .map(str::trim)
        .collect();

    let mut deleted = Vec::new();
    for line in content_lines(&result.std_err) {
        let Some(rest) = line.strip_prefix(TERMINATING_PREFIX) else {
            continue;
        };
        let id = rest.split_whitespace().next().unwrap_or_default();
        if failed.contains(id) {
            continue;
        }
        deleted.push(DeletedJobInfo {
            id: parse_value("job id", id)?,
            owner: owner.to_string(),
        });
    }

    if deleted.is_empty() {
        return Err(GridError::NotFound(format!(
            "No jobs were deleted: {}",
            result.std_err.join("\n")
        )));
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "JOBID|USER|STATE|REASON|NAME|PARTITION|SUBMIT_TIME|CPUS";

    #[test]
    fn listing_skips_header_and_maps_fields() {
        let result = CommandResult::new(
            0,
            [
                HEADER,
                "12|alice|RUNNING|None|train.sh|gpu|2024-03-01T10:15:00|8",
                "13|bob|PENDING|Resources|wrap|normal|N/A|1",
            ],
            Vec::<String>::new(),
        );
        let jobs = parse_job_listing(&result).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, 12);
        assert_eq!(jobs[0].owner.as_deref(), Some("alice"));
        assert_eq!(jobs[0].state, JobState::Running(Some("RUNNING".to_string())));
        assert_eq!(jobs[0].queue.as_deref(), Some("gpu"));
        assert_eq!(jobs[0].slots, Some(8));
        assert!(jobs[0].submitted_at.is_some());
        assert_eq!(jobs[1].submitted_at, None);
    }

    #[test]
    fn header_only_is_empty() {
        let result = CommandResult::new(0, [HEADER], Vec::<String>::new());
        assert!(parse_job_listing(&result).unwrap().is_empty());
    }

    #[test]
    fn listing_rejects_wrong_field_count() {
        let result = CommandResult::new(0, [HEADER, "12|alice|RUNNING"], Vec::<String>::new());
        let err = parse_job_listing(&result).unwrap_err();
        assert!(matches!(
            err,
            GridError::MalformedOutput(OutputError::FieldCount { expected: 8, actual: 3, .. })
        ));
    }

    #[test]
    fn submission_extracts_id() {
        let result = CommandResult::new(0, ["Submitted batch job 4711"], Vec::<String>::new());
        let job = parse_submission(&result).unwrap();
        assert_eq!(job.id, 4711);
        assert!(matches!(job.state, JobState::Pending(_)));
    }

    #[test]
    fn unrecognized_submission_is_malformed() {
        let result = CommandResult::new(0, ["Job queued"], Vec::<String>::new());
        assert!(parse_submission(&result).unwrap_err().is_malformed_output());
    }

    #[test]
    fn deletion_excludes_failed_ids() {
        let result = CommandResult::new(
            0,
            Vec::<String>::new(),
            [
                "scancel: Terminating job 5",
                "scancel: error: Kill job error on job id 6: Invalid job id specified",
            ],
        );
        let deleted = parse_deletion(&result, "alice").unwrap();
        assert_eq!(
            deleted,
            vec![DeletedJobInfo {
                id: 5,
                owner: "alice".to_string()
            }]
        );
    }

    #[test]
    fn deletion_of_failing_id_is_not_found() {
        let result = CommandResult::new(
            0,
            Vec::<String>::new(),
            [
                "scancel: Terminating job 6",
                "scancel: error: Kill job error on job id 6: Job/step already completing or completed",
            ],
        );
        assert!(matches!(
            parse_deletion(&result, "alice"),
            Err(GridError::NotFound(_))
        ));
    }
}
