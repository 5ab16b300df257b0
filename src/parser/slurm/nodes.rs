use crate::cmd::CommandResult;
use crate::entity::{Host, Topology};
use crate::error::{GridError, OutputError, Result};
use crate::parser::fields::{content_lines, KeyValues};
use crate::parser::require_success;

const SCONTROL: &str = "scontrol";
const MIB: u64 = 1024 * 1024;

const NODE_NAME: &str = "NodeName";
const ARCH: &str = "Arch";
const CPU_TOTAL: &str = "CPUTot";
const SOCKETS: &str = "Sockets";
const CORES_PER_SOCKET: &str = "CoresPerSocket";
const THREADS_PER_CORE: &str = "ThreadsPerCore";
const REAL_MEMORY: &str = "RealMemory";
const ALLOCATED_MEMORY: &str = "AllocMem";

/// Parse `scontrol show node --oneliner` output, one node per line.
pub fn parse_nodes(result: &CommandResult) -> Result<Vec<Host>> {
    require_success(result, SCONTROL)?;
    content_lines(&result.std_out)
        .map(|line| parse_node(line).map_err(GridError::from))
        .collect()
}

/// One `Key=Value` node description. Memory is reported in MiB.
pub fn parse_node(line: &str) -> std::result::Result<Host, OutputError> {
    let kv = KeyValues::parse(line);
    let name = kv.require(NODE_NAME)?.to_string();
    let physical = mebibytes(&kv, REAL_MEMORY)?;
    let allocated = mebibytes(&kv, ALLOCATED_MEMORY)?;
    if allocated > physical {
        return Err(OutputError::MemoryExceeded {
            host: name,
            allocated,
            physical,
        });
    }

    Ok(Host {
        arch: Some(kv.require(ARCH)?.to_string()),
        cpus: Some(kv.require_parsed(CPU_TOTAL)?),
        topology: Some(Topology {
            sockets: kv.require_parsed(SOCKETS)?,
            cores_per_socket: kv.require_parsed(CORES_PER_SOCKET)?,
            threads_per_core: kv.require_parsed(THREADS_PER_CORE)?,
        }),
        physical_memory: Some(physical),
        allocated_memory: Some(allocated),
        name,
    })
}

/// A MiB count in bytes. Counts too large for `u64` bytes are invalid.
fn mebibytes(kv: &KeyValues, key: &str) -> std::result::Result<u64, OutputError> {
    let count = kv.require_parsed::<u64>(key)?;
    count.checked_mul(MIB).ok_or_else(|| OutputError::InvalidValue {
        field: key.to_string(),
        value: count.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE: &str = "NodeName=worker1 Arch=x86_64 CoresPerSocket=4 CPUAlloc=0 CPUTot=8 \
        Sockets=2 ThreadsPerCore=1 RealMemory=2048 AllocMem=512 State=IDLE Reason=none";

    #[test]
    fn node_fields_and_memory_in_bytes() {
        let host = parse_node(NODE).unwrap();
        assert_eq!(host.name, "worker1");
        assert_eq!(host.arch.as_deref(), Some("x86_64"));
        assert_eq!(host.cpus, Some(8));
        assert_eq!(
            host.topology,
            Some(Topology {
                sockets: 2,
                cores_per_socket: 4,
                threads_per_core: 1
            })
        );
        assert_eq!(host.physical_memory, Some(2048 * MIB));
        assert_eq!(host.allocated_memory, Some(512 * MIB));
    }

    #[test]
    fn missing_key_is_named() {
        let err = parse_node("NodeName=worker1 Arch=x86_64").unwrap_err();
        assert!(matches!(err, OutputError::MissingKey { ref key, .. } if key == REAL_MEMORY));
    }

    #[test]
    fn memory_overflowing_bytes_is_invalid() {
        let line = NODE.replace("RealMemory=2048", "RealMemory=18446744073709551");
        assert!(matches!(
            parse_node(&line),
            Err(OutputError::InvalidValue { ref field, ref value }) if field == REAL_MEMORY && value == "18446744073709551"
        ));
    }

    #[test]
    fn allocation_above_physical_is_rejected() {
        let line = NODE.replace("AllocMem=512", "AllocMem=4096");
        assert!(matches!(
            parse_node(&line),
            Err(OutputError::MemoryExceeded { .. })
        ));
    }

    #[test]
    fn one_host_per_line() {
        let second = NODE.replace("worker1", "worker2");
        let result = CommandResult::new(0, [NODE.to_string(), String::new(), second], Vec::<String>::new());
        let hosts = parse_nodes(&result).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[1].name, "worker2");
    }
}
