use std::path::PathBuf;

use crate::cmd::{escape, escape_env, escape_quotes, CommandCompiler, CommandContext, CommandResult, Execute};
use crate::config::{resolve_log_dir, BridgeConfig, EngineKind, SgeConfig};
use crate::entity::{DeletedJobInfo, HealthCheckInfo, Host, Job, Queue};
use crate::error::{GridError, Result};
use crate::parser::sge;
use crate::provider::{argument, deletion_not_found, optional_argument};
use crate::provider::request::{DeleteJobFilter, HostFilter, JobFilter, JobOptions, QueueFilter, QueueRequest};

/// `qsub -p` range.
pub const MIN_PRIORITY: i64 = -1023;
pub const MAX_PRIORITY: i64 = 1024;

const QSTAT: &str = "qstat";
const QSUB: &str = "qsub";
const QDEL: &str = "qdel";
const QCONF_LIST_QUEUES: &str = "qconf_list_queues";
const QCONF_SHOW_QUEUE: &str = "qconf_show_queue";
const QHOST: &str = "qhost";
const QPING: &str = "qping";

/// Jobs, cluster queues, execution hosts and qmaster health on Grid Engine.
pub struct SgeProvider<E> {
    compiler: CommandCompiler,
    executor: E,
    shared_folder: PathBuf,
    log_dir: PathBuf,
    qmaster: SgeConfig,
}

impl<E: Execute> SgeProvider<E> {
    pub fn new(compiler: CommandCompiler, executor: E, config: &BridgeConfig) -> Self {
        Self {
            compiler,
            executor,
            shared_folder: config.shared_folder.clone(),
            log_dir: config.log_dir.clone(),
            qmaster: config.sge.clone(),
        }
    }

    async fn run(&self, operation: &str, context: &CommandContext) -> Result<CommandResult> {
        let argv = self.compiler.compile(EngineKind::Sge, operation, context)?;
        self.executor.execute(&argv).await
    }

    fn unsupported(operation: &str) -> GridError {
        GridError::Unsupported {
            operation: operation.to_string(),
            engine: EngineKind::Sge.to_string(),
        }
    }

    /// `qstat` filters by owner and state; ids and names are matched on the
    /// parsed listing.
    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let mut filter = filter.clone();
        filter.retain_valid_ids();
        let mut context = CommandContext::new();
        context.set_serialized("filter", &filter)?;
        let result = self.run(QSTAT, &context).await?;
        let jobs = sge::parse_job_listing(&result)?;
        Ok(jobs
            .into_iter()
            .filter(|job| filter.ids.is_empty() || filter.ids.iter().any(|id| *id as u64 == job.id))
            .filter(|job| {
                filter.names.is_empty()
                    || job
                        .name
                        .as_ref()
                        .is_some_and(|name| filter.names.contains(name))
            })
            .collect())
    }

    pub async fn submit_job(&self, options: &JobOptions) -> Result<Job> {
        options.validate(MIN_PRIORITY..=MAX_PRIORITY)?;
        if options.parallel.is_some() {
            return Err(Self::unsupported("parallel execution options"));
        }
        let log_dir = resolve_log_dir(&self.shared_folder, &self.log_dir)?;

        let arguments: Vec<String> = if options.can_be_binary {
            options.arguments.iter().map(|a| escape(a)).collect()
        } else {
            options.arguments.iter().map(|a| escape_quotes(a)).collect()
        };
        let log_dir = log_dir.display();
        let mut context = CommandContext::new();
        context
            .set("name", optional_argument("name", options.name.as_deref())?)
            .set("queue", optional_argument("queue", options.queue.as_deref())?)
            .set("priority", options.priority.map(|p| p.to_string()))
            .set("working_dir", optional_argument("working_dir", options.working_dir.as_deref())?)
            .set("output", argument("log directory", &format!("{log_dir}/$JOB_ID.out"))?)
            .set("error", argument("log directory", &format!("{log_dir}/$JOB_ID.err"))?)
            .set("binary", options.can_be_binary)
            .set("command", argument("command", &options.command)?)
            .set("arguments", arguments);
        if !options.env_variables.is_empty() {
            context.set("env_variables", argument("env_variables", &escape_env(&options.env_variables))?);
        }

        let result = self.run(QSUB, &context).await?;
        let job = sge::parse_submission(&result)?;
        tracing::info!(job_id = job.id, "Job submitted");
        Ok(job)
    }

    pub async fn delete_job(&self, filter: &DeleteJobFilter) -> Result<Vec<DeletedJobInfo>> {
        filter.validate()?;
        let mut context = CommandContext::new();
        context.set_serialized("filter", &filter.normalized())?;
        let result = self.run(QDEL, &context).await?;
        let deleted = sge::parse_deletion(&result).map_err(deletion_not_found)?;
        tracing::info!(count = deleted.len(), "Jobs deleted");
        Ok(deleted)
    }

    pub async fn list_queue_names(&self) -> Result<Vec<Queue>> {
        let result = self.run(QCONF_LIST_QUEUES, &CommandContext::new()).await?;
        Ok(sge::parse_queue_names(&result)?
            .into_iter()
            .map(Queue::named)
            .collect())
    }

    /// Full queue configurations; an empty filter means every queue.
    pub async fn list_queues(&self, filter: &QueueFilter) -> Result<Vec<Queue>> {
        let names = if filter.names.is_empty() {
            let result = self.run(QCONF_LIST_QUEUES, &CommandContext::new()).await?;
            sge::parse_queue_names(&result)?
        } else {
            filter.names.clone()
        };
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let context = CommandContext::new().with("queues", names);
        let result = self.run(QCONF_SHOW_QUEUE, &context).await?;
        sge::parse_queues(&result)
    }

    pub async fn register_queue(&self, _request: &QueueRequest) -> Result<Queue> {
        Err(Self::unsupported("queue registration"))
    }

    pub async fn update_queue(&self, _request: &QueueRequest) -> Result<Queue> {
        Err(Self::unsupported("queue update"))
    }

    pub async fn delete_queue(&self, _name: &str) -> Result<Queue> {
        Err(Self::unsupported("queue deletion"))
    }

    pub async fn list_hosts(&self, filter: &HostFilter) -> Result<Vec<Host>> {
        let context = CommandContext::new().with("hosts", filter.hosts.clone());
        let result = self.run(QHOST, &context).await?;
        sge::parse_hosts(&result)
    }

    pub async fn check_health(&self) -> Result<HealthCheckInfo> {
        let context = CommandContext::new()
            .with("host", self.qmaster.qmaster_host.clone())
            .with("port", self.qmaster.qmaster_port);
        let result = self.run(QPING, &context).await?;
        sge::parse_qping(&result)
    }
}
