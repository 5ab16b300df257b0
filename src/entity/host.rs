use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub sockets: u32,
    pub cores_per_socket: u32,
    pub threads_per_core: u32,
}

/// An execution host. Memory is in bytes; when both values are present,
/// `allocated_memory <= physical_memory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    pub arch: Option<String>,
    pub cpus: Option<u32>,
    pub topology: Option<Topology>,
    pub physical_memory: Option<u64>,
    pub allocated_memory: Option<u64>,
}
