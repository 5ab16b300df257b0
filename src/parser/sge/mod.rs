//! Parsers for Grid Engine client output (`qstat`, `qsub`, `qdel`, `qconf`,
//! `qhost`, `qping`).

pub mod health;
pub mod hosts;
pub mod jobs;
pub mod queues;

pub use health::parse_qping;
pub use hosts::{parse_host, parse_hosts, parse_memory};
pub use jobs::{parse_deletion, parse_job_listing, parse_submission};
pub use queues::{parse_queue_names, parse_queues, parse_slots};
