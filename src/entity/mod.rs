//! Value objects produced by the output parsers.

pub mod health;
pub mod host;
pub mod job;
pub mod queue;

pub use health::{EngineStatus, HealthCheckInfo, StatusInfo, NOT_PROVIDED};
pub use host::{Host, Topology};
pub use job::{DeletedJobInfo, Job, JobState};
pub use queue::{Queue, SlotsDescription};
