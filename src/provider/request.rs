//! Request objects accepted by providers, and the checks run on them before
//! any command is compiled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Selects jobs for a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilter {
    pub ids: Vec<i64>,
    pub owners: Vec<String>,
    pub names: Vec<String>,
    /// Scheduler-native state name to select
    pub state: Option<String>,
    /// List finished jobs too
    pub all_states: bool,
}

impl JobFilter {
    pub fn by_id(id: i64) -> Self {
        Self {
            ids: vec![id],
            ..Default::default()
        }
    }

    /// Drop ids no scheduler could have assigned.
    pub fn retain_valid_ids(&mut self) {
        self.ids.retain(|id| *id > 0);
    }
}

/// Resource shape of a parallel job (`--ntasks`, `--nodes`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelExecutionOptions {
    pub num_tasks: Option<u32>,
    pub nodes: Option<u32>,
    pub cpus_per_task: Option<u32>,
    pub num_tasks_per_node: Option<u32>,
    pub exclusive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub command: String,
    pub arguments: Vec<String>,
    pub name: Option<String>,
    pub queue: Option<String>,
    pub priority: Option<i64>,
    pub working_dir: Option<String>,
    pub env_variables: BTreeMap<String, String>,
    /// Submit `command` as a binary instead of a script
    pub can_be_binary: bool,
    pub parallel: Option<ParallelExecutionOptions>,
}

impl JobOptions {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_variables.insert(name.into(), value.into());
        self
    }

    /// Checks shared by every engine; the priority range is the engine's own.
    pub fn validate(&self, priority_range: std::ops::RangeInclusive<i64>) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(GridError::BadRequest("Command should be specified!".to_string()));
        }
        if let Some(priority) = self.priority {
            if !priority_range.contains(&priority) {
                return Err(GridError::BadRequest(format!(
                    "Priority should be between {} and {}",
                    priority_range.start(),
                    priority_range.end()
                )));
            }
        }
        Ok(())
    }
}

/// Selects jobs to delete. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteJobFilter {
    pub id: Option<i64>,
    pub user: Option<String>,
}

impl DeleteJobFilter {
    pub fn validate(&self) -> Result<()> {
        let has_user = self.user.as_deref().is_some_and(|u| !u.trim().is_empty());
        if !has_user && self.id.is_none() {
            return Err(GridError::BadRequest(
                "Either `id` or `user` should be specified for job removal!".to_string(),
            ));
        }
        if let Some(id) = self.id {
            if id <= 0 {
                return Err(GridError::BadRequest(format!(
                    "Id {} specified for job removal is invalid!",
                    id
                )));
            }
        }
        Ok(())
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// The same filter with a blank user dropped.
    pub fn normalized(&self) -> Self {
        Self {
            id: self.id,
            user: self.user().map(str::to_string),
        }
    }
}

/// Queue creation or update payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRequest {
    pub name: String,
    pub hosts: Vec<String>,
    pub allowed_user_groups: Vec<String>,
    pub owners: Vec<String>,
    pub parallel_environments: Vec<String>,
}

impl QueueRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Restricts a queue listing to the named queues; empty means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueFilter {
    pub names: Vec<String>,
}

/// Restricts a host listing to the named hosts; empty means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFilter {
    pub hosts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_ids_are_dropped() {
        let mut filter = JobFilter {
            ids: vec![3, 0, -1, 7],
            ..Default::default()
        };
        filter.retain_valid_ids();
        assert_eq!(filter.ids, vec![3, 7]);
    }

    #[test]
    fn job_options_require_command_and_priority_range() {
        assert!(matches!(
            JobOptions::new("  ").validate(0..=10),
            Err(GridError::BadRequest(_))
        ));

        let mut options = JobOptions::new("run.sh");
        options.priority = Some(11);
        assert!(options.validate(0..=10).is_err());
        options.priority = Some(0);
        assert!(options.validate(0..=10).is_ok());
    }

    #[test]
    fn delete_filter_needs_id_or_user() {
        assert!(DeleteJobFilter::default().validate().is_err());
        assert!(DeleteJobFilter {
            id: None,
            user: Some(" ".to_string())
        }
        .validate()
        .is_err());
        assert!(DeleteJobFilter {
            id: Some(0),
            user: Some("alice".to_string())
        }
        .validate()
        .is_err());
        assert!(DeleteJobFilter {
            id: Some(5),
            user: None
        }
        .validate()
        .is_ok());
    }
}
