//! Parsers for Slurm client output (`squeue`, `sbatch`, `scancel`, `sinfo`,
//! `scontrol`).

pub mod health;
pub mod jobs;
pub mod nodes;
pub mod partitions;

pub use health::{parse_ping, parse_show_config, parse_sinfo_summary};
pub use jobs::{parse_deletion, parse_job_listing, parse_submission};
pub use nodes::{parse_node, parse_nodes};
pub use partitions::{check_clean, parse_partition_names, parse_partitions};
