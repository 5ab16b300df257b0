//! Providers drive the pipeline for one scheduler: validate the request,
//! build a context, compile, execute, parse.
//!
//! [`GridProvider`] picks the implementation from [`EngineKind`]. Each
//! provider is generic over [`Execute`] so tests can replay canned output.

pub mod request;
pub mod sge;
pub mod slurm;

use chrono::NaiveDateTime;

use crate::cmd::{single_arg, CommandCompiler, CommandExecutor, CommandTemplateStore, Execute};
use crate::config::{BridgeConfig, EngineKind};
use crate::entity::{DeletedJobInfo, HealthCheckInfo, Host, Job, Queue};
use crate::error::{GridError, Result};

pub use request::{
    DeleteJobFilter, HostFilter, JobFilter, JobOptions, ParallelExecutionOptions, QueueFilter, QueueRequest,
};
pub use sge::SgeProvider;
pub use slurm::SlurmProvider;

/// A failed deletion command means the jobs were not there to delete.
pub(crate) fn deletion_not_found(err: GridError) -> GridError {
    match err {
        GridError::NonZeroExit {
            program,
            code,
            stderr,
        } => GridError::NotFound(format!("{} exited with code {}: {}", program, code, stderr)),
        other => other,
    }
}

/// A request value rendered as exactly one command argument.
pub(crate) fn argument(field: &str, value: &str) -> Result<String> {
    single_arg(value).ok_or_else(|| {
        GridError::BadRequest(format!("{} {:?} cannot be passed as a single argument", field, value))
    })
}

pub(crate) fn optional_argument(field: &str, value: Option<&str>) -> Result<Option<String>> {
    value.map(|v| argument(field, v)).transpose()
}

pub(crate) fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub enum GridProvider<E = CommandExecutor> {
    Slurm(SlurmProvider<E>),
    Sge(SgeProvider<E>),
}

macro_rules! dispatch {
    ($self:ident.$method:ident($($arg:expr),*)) => {
        match $self {
            GridProvider::Slurm(p) => p.$method($($arg),*).await,
            GridProvider::Sge(p) => p.$method($($arg),*).await,
        }
    };
}

impl GridProvider<CommandExecutor> {
    /// Build the provider for `config.engine`, spawning real processes.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let executor = CommandExecutor::new(config.executor.clone());
        Self::with_executor(config, executor)
    }
}

impl<E: Execute> GridProvider<E> {
    pub fn with_executor(config: &BridgeConfig, executor: E) -> Result<Self> {
        let templates = match &config.templates_dir {
            Some(dir) => CommandTemplateStore::with_overrides(dir)?,
            None => CommandTemplateStore::builtin()?,
        };
        let compiler = CommandCompiler::new(templates);
        tracing::info!(engine = %config.engine, "Provider ready");
        Ok(match config.engine {
            EngineKind::Slurm => GridProvider::Slurm(SlurmProvider::new(compiler, executor, config)),
            EngineKind::Sge => GridProvider::Sge(SgeProvider::new(compiler, executor, config)),
        })
    }

    pub fn engine(&self) -> EngineKind {
        match self {
            GridProvider::Slurm(_) => EngineKind::Slurm,
            GridProvider::Sge(_) => EngineKind::Sge,
        }
    }

    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        dispatch!(self.list_jobs(filter))
    }

    pub async fn submit_job(&self, options: &JobOptions) -> Result<Job> {
        dispatch!(self.submit_job(options))
    }

    pub async fn delete_job(&self, filter: &DeleteJobFilter) -> Result<Vec<DeletedJobInfo>> {
        dispatch!(self.delete_job(filter))
    }

    pub async fn list_queue_names(&self) -> Result<Vec<Queue>> {
        dispatch!(self.list_queue_names())
    }

    pub async fn list_queues(&self, filter: &QueueFilter) -> Result<Vec<Queue>> {
        dispatch!(self.list_queues(filter))
    }

    pub async fn register_queue(&self, request: &QueueRequest) -> Result<Queue> {
        dispatch!(self.register_queue(request))
    }

    pub async fn update_queue(&self, request: &QueueRequest) -> Result<Queue> {
        dispatch!(self.update_queue(request))
    }

    pub async fn delete_queue(&self, name: &str) -> Result<Queue> {
        dispatch!(self.delete_queue(name))
    }

    pub async fn list_hosts(&self, filter: &HostFilter) -> Result<Vec<Host>> {
        dispatch!(self.list_hosts(filter))
    }

    pub async fn check_health(&self) -> Result<HealthCheckInfo> {
        dispatch!(self.check_health())
    }

    /// Usage accounting is not exposed for any engine.
    pub async fn usage_report(&self) -> Result<()> {
        Err(GridError::Unsupported {
            operation: "usage report".to_string(),
            engine: self.engine().to_string(),
        })
    }
}
