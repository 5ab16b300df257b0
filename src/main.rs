use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use grid_bridge::config::{BridgeConfig, EngineKind, HealthProbe};
use grid_bridge::entity::{DeletedJobInfo, HealthCheckInfo, Host, Job, Queue};
use grid_bridge::provider::{
    DeleteJobFilter, GridProvider, HostFilter, JobFilter, JobOptions, QueueFilter, QueueRequest,
};

#[derive(Parser, Debug)]
#[command(name = "grid-bridge")]
#[command(version)]
#[command(about = "Uniform job, queue, host and health commands over Slurm and Grid Engine")]
#[command(propagate_version = true)]
struct Args {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Scheduler behind this bridge
    #[arg(long, value_enum, default_value = "slurm", global = true)]
    engine: EngineKind,

    /// Directory with <engine>/<operation>.hbs files overriding built-in templates
    #[arg(long, global = true)]
    templates_dir: Option<PathBuf>,

    /// Folder shared with the execution hosts
    #[arg(long, default_value = "/data", global = true)]
    shared_folder: PathBuf,

    /// Job log directory, absolute or relative to the shared folder
    #[arg(long, default_value = "logs", global = true)]
    log_dir: PathBuf,

    /// Directory holding the scheduler client binaries
    #[arg(long, global = true)]
    program_dir: Option<PathBuf>,

    /// Slurm health probe
    #[arg(long, value_enum, default_value = "show-config", global = true)]
    health_probe: HealthProbe,

    /// SGE qmaster host for health checks
    #[arg(long, default_value = "localhost", global = true)]
    sge_host: String,

    /// SGE qmaster port for health checks
    #[arg(long, default_value = "6444", global = true)]
    sge_port: u16,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Job management commands
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Queue (partition) management commands
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },

    /// Execution host commands
    Host {
        #[command(subcommand)]
        command: HostCommands,
    },

    /// Check scheduler controller health
    Health,
}

// =============================================================================
// Job Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum JobCommands {
    /// List jobs
    List {
        /// Job id (repeatable)
        #[arg(long = "id")]
        ids: Vec<i64>,

        /// Job owner (repeatable)
        #[arg(long = "owner")]
        owners: Vec<String>,

        /// Job name (repeatable)
        #[arg(long = "name")]
        names: Vec<String>,

        /// Scheduler-native state to select
        #[arg(long)]
        state: Option<String>,

        /// Include finished jobs
        #[arg(long)]
        all: bool,
    },
    /// Submit a job
    Submit {
        /// Script or binary to run
        command: String,

        /// Arguments passed to the command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        arguments: Vec<String>,

        #[arg(long)]
        name: Option<String>,

        /// Queue or partition
        #[arg(long)]
        queue: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        priority: Option<i64>,

        /// Working directory on the execution host
        #[arg(long)]
        workdir: Option<String>,

        /// Environment variable NAME=VALUE, or a bare NAME (repeatable)
        #[arg(long = "env", value_parser = parse_env)]
        env: Vec<(String, String)>,

        /// Submit the command as a binary instead of a script
        #[arg(long)]
        binary: bool,
    },
    /// Delete jobs by id and/or owner
    Delete {
        #[arg(long)]
        id: Option<i64>,

        #[arg(long)]
        user: Option<String>,
    },
}

// =============================================================================
// Queue Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum QueueCommands {
    /// List queues
    List {
        /// Queue name (repeatable); all queues when omitted
        #[arg(long = "name")]
        names: Vec<String>,

        /// Print queue names only
        #[arg(long)]
        names_only: bool,
    },
    /// Create a queue
    Create(QueueArgs),
    /// Replace a queue's hosts and groups
    Update(QueueArgs),
    /// Delete a queue
    Delete { name: String },
}

#[derive(Parser, Debug)]
struct QueueArgs {
    name: String,

    /// Host or host range such as node[1-4] (repeatable)
    #[arg(long = "host")]
    hosts: Vec<String>,

    /// Allowed user group (repeatable)
    #[arg(long = "group")]
    groups: Vec<String>,
}

impl From<QueueArgs> for QueueRequest {
    fn from(args: QueueArgs) -> Self {
        QueueRequest {
            name: args.name,
            hosts: args.hosts,
            allowed_user_groups: args.groups,
            ..Default::default()
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum HostCommands {
    /// List execution hosts
    List {
        /// Host names; all hosts when omitted
        hosts: Vec<String>,
    },
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_env(value: &str) -> Result<(String, String), String> {
    let (name, value) = value.split_once('=').unwrap_or((value, ""));
    if name.trim().is_empty() {
        return Err("environment variable name is empty".to_string());
    }
    Ok((name.to_string(), value.to_string()))
}

fn build_config(args: &GlobalArgs) -> BridgeConfig {
    let mut config = BridgeConfig::new(args.engine)
        .with_shared_folder(&args.shared_folder)
        .with_log_dir(&args.log_dir);
    if let Some(dir) = &args.templates_dir {
        config = config.with_templates_dir(dir);
    }
    config.executor.program_dir = args.program_dir.clone();
    config.health_probe = args.health_probe;
    config.sge.qmaster_host = args.sge_host.clone();
    config.sge.qmaster_port = args.sge_port;
    config
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn or_dash(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    println!(
        "{:<10} {:<12} {:<24} {:<12} {:<20} {:<6} NAME",
        "JOB ID", "OWNER", "STATE", "QUEUE", "SUBMITTED", "SLOTS"
    );
    println!("{}", "-".repeat(96));
    for job in jobs {
        println!(
            "{:<10} {:<12} {:<24} {:<12} {:<20} {:<6} {}",
            job.id,
            or_dash(job.owner.as_ref()),
            job.state.to_string(),
            or_dash(job.queue.as_ref()),
            or_dash(job.submitted_at),
            or_dash(job.slots),
            or_dash(job.name.as_ref())
        );
    }
}

fn print_deleted(deleted: &[DeletedJobInfo]) {
    println!("{:<10} OWNER", "JOB ID");
    println!("{}", "-".repeat(30));
    for job in deleted {
        println!("{:<10} {}", job.id, job.owner);
    }
}

fn print_queues(queues: &[Queue]) {
    if queues.is_empty() {
        println!("No queues found.");
        return;
    }
    println!("{:<16} {:<8} {:<24} HOSTS", "NAME", "SLOTS", "GROUPS");
    println!("{}", "-".repeat(72));
    for queue in queues {
        println!(
            "{:<16} {:<8} {:<24} {}",
            queue.name,
            or_dash(queue.slots.as_ref().map(|s| s.total_slots)),
            queue.allowed_user_groups.join(","),
            queue.hosts.join(",")
        );
    }
}

fn print_hosts(hosts: &[Host]) {
    if hosts.is_empty() {
        println!("No hosts found.");
        return;
    }
    println!(
        "{:<16} {:<10} {:<6} {:<10} {:<16} ALLOCATED",
        "NAME", "ARCH", "CPUS", "TOPOLOGY", "MEMORY"
    );
    println!("{}", "-".repeat(80));
    for host in hosts {
        let topology = host
            .topology
            .map(|t| format!("{}x{}x{}", t.sockets, t.cores_per_socket, t.threads_per_core));
        println!(
            "{:<16} {:<10} {:<6} {:<10} {:<16} {}",
            host.name,
            or_dash(host.arch.as_ref()),
            or_dash(host.cpus),
            or_dash(topology),
            or_dash(host.physical_memory),
            or_dash(host.allocated_memory)
        );
    }
}

fn print_health(health: &HealthCheckInfo) {
    println!("Status:     {:?} ({})", health.status_info.status, health.status_info.code);
    println!("Info:       {}", health.status_info.info);
    println!("Started:    {}", health.start_time);
    println!("Checked:    {}", health.check_time);
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn handle_job(
    provider: &GridProvider,
    command: JobCommands,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        JobCommands::List {
            ids,
            owners,
            names,
            state,
            all,
        } => {
            let filter = JobFilter {
                ids,
                owners,
                names,
                state,
                all_states: all,
            };
            let jobs = provider.list_jobs(&filter).await?;
            match output {
                OutputFormat::Json => print_json(&jobs)?,
                OutputFormat::Table => print_jobs(&jobs),
            }
        }
        JobCommands::Submit {
            command,
            arguments,
            name,
            queue,
            priority,
            workdir,
            env,
            binary,
        } => {
            let options = JobOptions {
                command,
                arguments,
                name,
                queue,
                priority,
                working_dir: workdir,
                env_variables: env.into_iter().collect(),
                can_be_binary: binary,
                parallel: None,
            };
            let job = provider.submit_job(&options).await?;
            match output {
                OutputFormat::Json => print_json(&job)?,
                OutputFormat::Table => {
                    println!("Job submitted successfully!");
                    println!("Job ID: {}", job.id);
                }
            }
        }
        JobCommands::Delete { id, user } => {
            let deleted = provider.delete_job(&DeleteJobFilter { id, user }).await?;
            match output {
                OutputFormat::Json => print_json(&deleted)?,
                OutputFormat::Table => print_deleted(&deleted),
            }
        }
    }
    Ok(())
}

async fn handle_queue(
    provider: &GridProvider,
    command: QueueCommands,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let queues = match command {
        QueueCommands::List { names, names_only } => {
            if names_only {
                provider.list_queue_names().await?
            } else {
                provider.list_queues(&QueueFilter { names }).await?
            }
        }
        QueueCommands::Create(args) => vec![provider.register_queue(&args.into()).await?],
        QueueCommands::Update(args) => vec![provider.update_queue(&args.into()).await?],
        QueueCommands::Delete { name } => vec![provider.delete_queue(&name).await?],
    };
    match output {
        OutputFormat::Json => print_json(&queues)?,
        OutputFormat::Table => print_queues(&queues),
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args.global);
    let provider = GridProvider::from_config(&config)?;
    let output = &args.global.output;

    match args.command {
        Commands::Job { command } => handle_job(&provider, command, output).await?,
        Commands::Queue { command } => handle_queue(&provider, command, output).await?,
        Commands::Host {
            command: HostCommands::List { hosts },
        } => {
            let hosts = provider.list_hosts(&HostFilter { hosts }).await?;
            match output {
                OutputFormat::Json => print_json(&hosts)?,
                OutputFormat::Table => print_hosts(&hosts),
            }
        }
        Commands::Health => {
            let health = provider.check_health().await?;
            match output {
                OutputFormat::Json => print_json(&health)?,
                OutputFormat::Table => print_health(&health),
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
