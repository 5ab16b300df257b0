use std::path::PathBuf;

use crate::cmd::{
    enclose_in_quotes, escape_env, escape_quotes, quote, CommandCompiler, CommandContext, CommandResult, Execute,
};
use crate::config::{resolve_log_dir, BridgeConfig, EngineKind, HealthProbe};
use crate::entity::{DeletedJobInfo, HealthCheckInfo, Host, Job, Queue};
use crate::error::{GridError, Result};
use crate::parser::hosts::normalize_hosts;
use crate::parser::slurm;
use crate::provider::request::{DeleteJobFilter, HostFilter, JobFilter, JobOptions, QueueFilter, QueueRequest};
use crate::provider::{argument, deletion_not_found, local_now, optional_argument};

/// Highest priority `sbatch` accepts.
pub const MAX_PRIORITY: i64 = 4_294_967_294;

const SQUEUE: &str = "squeue";
const SBATCH: &str = "sbatch";
const SCANCEL: &str = "scancel";
const SINFO: &str = "sinfo";
const SCONTROL_PARTITION: &str = "scontrol_partition";
const SCONTROL_SHOW_NODE: &str = "scontrol_show_node";
const SHOW_CONFIG: &str = "show_config";
const PING: &str = "ping";
const SINFO_SUMMARY: &str = "sinfo_summary";

const NO_CHANGES: &str = "New partition properties and the current one are equal";

/// Jobs, partitions, nodes and controller health on a Slurm cluster.
pub struct SlurmProvider<E> {
    compiler: CommandCompiler,
    executor: E,
    shared_folder: PathBuf,
    log_dir: PathBuf,
    health_probe: HealthProbe,
}

impl<E: Execute> SlurmProvider<E> {
    pub fn new(compiler: CommandCompiler, executor: E, config: &BridgeConfig) -> Self {
        Self {
            compiler,
            executor,
            shared_folder: config.shared_folder.clone(),
            log_dir: config.log_dir.clone(),
            health_probe: config.health_probe,
        }
    }

    async fn run(&self, operation: &str, context: &CommandContext) -> Result<CommandResult> {
        let argv = self.compiler.compile(EngineKind::Slurm, operation, context)?;
        self.executor.execute(&argv).await
    }

    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let mut filter = filter.clone();
        filter.retain_valid_ids();
        let mut context = CommandContext::new();
        context.set_serialized("filter", &filter)?;
        let result = self.run(SQUEUE, &context).await?;
        slurm::parse_job_listing(&result)
    }

    pub async fn submit_job(&self, options: &JobOptions) -> Result<Job> {
        options.validate(0..=MAX_PRIORITY)?;
        let log_dir = resolve_log_dir(&self.shared_folder, &self.log_dir)?;
        let log_dir = log_dir.display();

        let mut context = CommandContext::new();
        context
            .set("name", optional_argument("name", options.name.as_deref())?)
            .set("queue", optional_argument("queue", options.queue.as_deref())?)
            .set("priority", options.priority.map(|p| p.to_string()))
            .set("working_dir", optional_argument("working_dir", options.working_dir.as_deref())?)
            .set("output", argument("log directory", &format!("{log_dir}/%j.out"))?)
            .set("error", argument("log directory", &format!("{log_dir}/%j.err"))?);
        if !options.env_variables.is_empty() {
            let export = format!("ALL,{}", escape_env(&options.env_variables));
            context.set("export", argument("env_variables", &export)?);
        }
        if let Some(parallel) = &options.parallel {
            context.set_serialized("parallel", parallel)?;
        }
        if options.can_be_binary {
            let mut binary = vec![options.command.clone()];
            binary.extend(options.arguments.iter().map(|arg| enclose_in_quotes(arg)));
            let binary = binary.join(" ");
            let wrap = quote(&binary).ok_or_else(|| {
                GridError::BadRequest(format!("command {:?} cannot be wrapped as a single argument", binary))
            })?;
            context.set("wrap", wrap);
        } else {
            let arguments: Vec<String> = options.arguments.iter().map(|a| escape_quotes(a)).collect();
            context
                .set("command", argument("command", &options.command)?)
                .set("arguments", arguments);
        }

        let result = self.run(SBATCH, &context).await?;
        let job = slurm::parse_submission(&result)?;
        tracing::info!(job_id = job.id, "Job submitted");
        Ok(job)
    }

    /// Cancel jobs by id, by owner, or both. Without a user the owner is
    /// read from the job listing first.
    pub async fn delete_job(&self, filter: &DeleteJobFilter) -> Result<Vec<DeletedJobInfo>> {
        filter.validate()?;
        let owner = match (filter.user(), filter.id) {
            (Some(user), _) => user.to_string(),
            (None, id) => self.owner_of(id).await?,
        };

        let mut context = CommandContext::new();
        context.set_serialized("filter", &filter.normalized())?;
        let result = self.run(SCANCEL, &context).await?;
        let deleted = slurm::parse_deletion(&result, &owner).map_err(deletion_not_found)?;
        tracing::info!(count = deleted.len(), owner = %owner, "Jobs deleted");
        Ok(deleted)
    }

    async fn owner_of(&self, id: Option<i64>) -> Result<String> {
        let id = id.ok_or_else(|| GridError::BadRequest("Job id or user should be specified".to_string()))?;
        let job = self
            .list_jobs(&JobFilter::by_id(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GridError::NotFound(format!("Job {} for removal not found", id)))?;
        Ok(job.owner.unwrap_or_default())
    }

    /// Partition names only.
    pub async fn list_queue_names(&self) -> Result<Vec<Queue>> {
        let result = self.run(SINFO, &CommandContext::new()).await?;
        Ok(slurm::parse_partition_names(&result)?
            .into_iter()
            .map(Queue::named)
            .collect())
    }

    pub async fn list_queues(&self, filter: &QueueFilter) -> Result<Vec<Queue>> {
        let context = CommandContext::new().with("partitions", filter.names.clone());
        let result = self.run(SINFO, &context).await?;
        slurm::parse_partitions(&result)
    }

    pub async fn register_queue(&self, request: &QueueRequest) -> Result<Queue> {
        check_queue_request(request)?;
        let context = CommandContext::new()
            .with("action", "create")
            .with("partition", request.name.clone())
            .with("groups", request.allowed_user_groups.clone())
            .with("hosts", request.hosts.clone());
        let result = self.run(SCONTROL_PARTITION, &context).await?;
        slurm::check_clean(&result, "scontrol")?;
        tracing::info!(partition = %request.name, "Partition created");

        Ok(Queue {
            name: request.name.clone(),
            hosts: request.hosts.clone(),
            allowed_user_groups: request.allowed_user_groups.clone(),
            slots: None,
        })
    }

    /// Replace a partition's nodes and groups. The current state is read
    /// first; a request that would change nothing is rejected.
    pub async fn update_queue(&self, request: &QueueRequest) -> Result<Queue> {
        check_queue_request(request)?;
        if request.hosts.is_empty() || request.allowed_user_groups.is_empty() {
            return Err(GridError::BadRequest(
                "Name, host list and allowed user groups should be specified for partition update".to_string(),
            ));
        }

        let current = self.fetch_partition(&request.name).await?;
        let current_hosts = normalize_hosts(&current.hosts)?;
        let new_hosts = normalize_hosts(&request.hosts)?;
        let mut new_groups = request.allowed_user_groups.clone();
        new_groups.sort();
        if current_hosts == new_hosts
            && normalize_groups(&current.allowed_user_groups) == normalize_groups(&new_groups)
        {
            return Err(GridError::BadRequest(NO_CHANGES.to_string()));
        }

        let context = CommandContext::new()
            .with("action", "update")
            .with("partition", request.name.clone())
            .with("groups", new_groups.clone())
            .with("hosts", new_hosts.clone());
        let result = self.run(SCONTROL_PARTITION, &context).await?;
        slurm::check_clean(&result, "scontrol")?;
        tracing::info!(partition = %request.name, hosts = new_hosts.len(), "Partition updated");

        Ok(Queue {
            name: request.name.clone(),
            hosts: new_hosts,
            allowed_user_groups: new_groups,
            slots: current.slots,
        })
    }

    async fn fetch_partition(&self, name: &str) -> Result<Queue> {
        let context = CommandContext::new().with("partitions", vec![name.to_string()]);
        let result = self.run(SINFO, &context).await?;
        if !result.success() || !result.std_err.is_empty() || result.std_out.is_empty() {
            return Err(GridError::BadRequest(format!(
                "Failed to fetch partition data. Check partition name {}: {}",
                name,
                result.std_err.join("\n")
            )));
        }
        slurm::parse_partitions(&result)?
            .into_iter()
            .find(|queue| queue.name == name)
            .ok_or_else(|| GridError::BadRequest(format!("Partition {} was not found", name)))
    }

    pub async fn delete_queue(&self, name: &str) -> Result<Queue> {
        if name.trim().is_empty() {
            return Err(GridError::BadRequest(
                "Partition name for deletion should be specified".to_string(),
            ));
        }
        let context = CommandContext::new()
            .with("action", "delete")
            .with("partition", name);
        let result = self.run(SCONTROL_PARTITION, &context).await?;
        slurm::check_clean(&result, "scontrol")?;
        tracing::info!(partition = %name, "Partition deleted");
        Ok(Queue::named(name))
    }

    pub async fn list_hosts(&self, filter: &HostFilter) -> Result<Vec<Host>> {
        let context = CommandContext::new().with("hosts", filter.hosts.clone());
        let result = self.run(SCONTROL_SHOW_NODE, &context).await?;
        slurm::parse_nodes(&result)
    }

    pub async fn check_health(&self) -> Result<HealthCheckInfo> {
        let now = local_now();
        let context = CommandContext::new();
        match self.health_probe {
            HealthProbe::ShowConfig => {
                let result = self.run(SHOW_CONFIG, &context).await?;
                slurm::parse_show_config(&result, now)
            }
            HealthProbe::Ping => {
                let result = self.run(PING, &context).await?;
                slurm::parse_ping(&result, now)
            }
            HealthProbe::Sinfo => {
                let result = self.run(SINFO_SUMMARY, &context).await?;
                slurm::parse_sinfo_summary(&result, now)
            }
        }
    }
}

fn check_queue_request(request: &QueueRequest) -> Result<()> {
    if request.name.trim().is_empty() {
        return Err(GridError::BadRequest("Partition name option is obligatory".to_string()));
    }
    if !request.parallel_environments.is_empty() {
        return Err(GridError::Unsupported {
            operation: "parallel environments for partitions".to_string(),
            engine: EngineKind::Slurm.to_string(),
        });
    }
    if !request.owners.is_empty() {
        return Err(GridError::Unsupported {
            operation: "partition owners".to_string(),
            engine: EngineKind::Slurm.to_string(),
        });
    }
    Ok(())
}

fn normalize_groups(groups: &[String]) -> Vec<String> {
    let mut upper: Vec<String> = groups.iter().map(|g| g.trim().to_uppercase()).collect();
    upper.sort();
    upper.dedup();
    upper
}
