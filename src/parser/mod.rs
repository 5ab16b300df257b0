//! Output parsers: captured scheduler output in, entities or errors out.
//!
//! Parsers are free functions over a [`CommandResult`]. They never choose a
//! caller-visible error class; that belongs to the provider that ran the
//! command. A parser either returns a fully populated entity or fails with
//! the offending line and the shape it expected.

pub mod fields;
pub mod hosts;
pub mod sge;
pub mod slurm;

use crate::cmd::CommandResult;
use crate::error::{GridError, Result};

pub use hosts::{expand_hosts, normalize_hosts, same_hosts, split_host_list};

/// Phrase a scheduler client prints when its controller does not answer.
pub const CANT_FIND_CONNECTION: &str = "can't find connection";

/// Common pre-checks for every health probe: an empty answer means nothing
/// was reached, and a refusal on a failed exit means the controller is down
/// or unreachable.
pub(crate) fn check_health_response(result: &CommandResult, program: &str) -> Result<()> {
    let Some(first) = result.std_out.first() else {
        return Err(GridError::NotFound(format!(
            "{} returned no output (exit code {}): {}",
            program,
            result.exit_code,
            result.std_err.join("\n")
        )));
    };
    if !result.success() && first.contains(CANT_FIND_CONNECTION) && !result.std_err.is_empty() {
        return Err(GridError::Unreachable(
            "Can't find connection via specified port".to_string(),
        ));
    }
    Ok(())
}

/// Fails on a nonzero exit, and logs stderr a successful command still wrote.
pub(crate) fn require_success(result: &CommandResult, program: &str) -> Result<()> {
    result.ensure_success(program)?;
    if !result.std_err.is_empty() {
        tracing::warn!(program, stderr = %result.std_err.join("\n"), "Command succeeded with stderr output");
    }
    Ok(())
}
