use crate::cmd::CommandResult;
use crate::entity::{Host, Topology};
use crate::error::{GridError, OutputError, Result};
use crate::parser::fields::{content_lines, parse_value, split_columns};
use crate::parser::require_success;

const QHOST: &str = "qhost";

/// HOSTNAME ARCH NCPU NSOC NCOR NTHR LOAD MEMTOT MEMUSE SWAPTO SWAPUS
const QHOST_COLUMNS: usize = 11;
const GLOBAL_HOST: &str = "global";
const ABSENT: &str = "-";

fn present(value: &str) -> Option<&str> {
    (value != ABSENT).then_some(value)
}

fn optional<T: std::str::FromStr>(field: &str, value: &str) -> std::result::Result<Option<T>, OutputError> {
    present(value).map(|v| parse_value(field, v)).transpose()
}

/// `3.8G`, `512.0M`, `0.0` to bytes.
pub fn parse_memory(value: &str) -> std::result::Result<u64, OutputError> {
    let (number, multiplier) = match value.chars().last() {
        Some('K') | Some('k') => (&value[..value.len() - 1], 1u64 << 10),
        Some('M') | Some('m') => (&value[..value.len() - 1], 1 << 20),
        Some('G') | Some('g') => (&value[..value.len() - 1], 1 << 30),
        Some('T') | Some('t') => (&value[..value.len() - 1], 1 << 40),
        _ => (value, 1),
    };
    let amount: f64 = parse_value("memory", number)?;
    let bytes = (amount * multiplier as f64).round();
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return Err(OutputError::InvalidValue {
            field: "memory".to_string(),
            value: value.to_string(),
        });
    }
    Ok(bytes as u64)
}

fn optional_memory(value: &str) -> std::result::Result<Option<u64>, OutputError> {
    present(value).map(parse_memory).transpose()
}

/// Parse the `qhost` table, skipping its header, separator and `global` row.
pub fn parse_hosts(result: &CommandResult) -> Result<Vec<Host>> {
    require_success(result, QHOST)?;
    content_lines(&result.std_out)
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.starts_with("HOSTNAME") && !trimmed.starts_with("---")
        })
        .filter_map(|line| match parse_host(line) {
            Ok(Some(host)) => Some(Ok(host)),
            Ok(None) => None,
            Err(e) => Some(Err(GridError::from(e))),
        })
        .collect()
}

/// One `qhost` row; `None` for the `global` pseudo-host.
pub fn parse_host(line: &str) -> std::result::Result<Option<Host>, OutputError> {
    let columns = split_columns(line, QHOST_COLUMNS, QHOST_COLUMNS)?;
    let name = columns[0];
    if name == GLOBAL_HOST {
        return Ok(None);
    }

    let sockets: Option<u32> = optional("NSOC", columns[3])?;
    let cores: Option<u32> = optional("NCOR", columns[4])?;
    let threads: Option<u32> = optional("NTHR", columns[5])?;
    let topology = match (sockets, cores, threads) {
        (Some(s), Some(c), Some(t)) if s > 0 && c > 0 => Some(Topology {
            sockets: s,
            cores_per_socket: c / s,
            threads_per_core: t / c,
        }),
        _ => None,
    };

    let physical = optional_memory(columns[7])?;
    let allocated = optional_memory(columns[8])?;
    if let (Some(p), Some(a)) = (physical, allocated) {
        if a > p {
            return Err(OutputError::MemoryExceeded {
                host: name.to_string(),
                allocated: a,
                physical: p,
            });
        }
    }

    Ok(Some(Host {
        name: name.to_string(),
        arch: present(columns[1]).map(str::to_string),
        cpus: optional("NCPU", columns[2])?,
        topology,
        physical_memory: physical,
        allocated_memory: allocated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_suffixes() {
        assert_eq!(parse_memory("512.0M").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_memory("2G").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_memory("0.0").unwrap(), 0);
        assert!(parse_memory("lots").is_err());
    }

    #[test]
    fn non_finite_memory_is_rejected() {
        for value in ["NaN", "inf", "-infG", "1e400", "1e30T", "-1M"] {
            assert!(
                matches!(parse_memory(value), Err(OutputError::InvalidValue { .. })),
                "{value} accepted"
            );
        }
    }

    #[test]
    fn table_rows_become_hosts() {
        let result = CommandResult::new(
            0,
            [
                "HOSTNAME                ARCH         NCPU NSOC NCOR NTHR  LOAD  MEMTOT  MEMUSE  SWAPTO  SWAPUS",
                "----------------------------------------------------------------------------------------------",
                "global                  -               -    -    -    -     -       -       -       -       -",
                "worker1                 lx-amd64        8    2    8   16  0.01    3.8G  512.0M    1.0G     0.0",
                "worker2                 -               -    -    -    -     -       -       -       -       -",
            ],
            Vec::<String>::new(),
        );
        let hosts = parse_hosts(&result).unwrap();
        assert_eq!(hosts.len(), 2);
        let worker1 = &hosts[0];
        assert_eq!(worker1.cpus, Some(8));
        assert_eq!(
            worker1.topology,
            Some(Topology {
                sockets: 2,
                cores_per_socket: 4,
                threads_per_core: 2
            })
        );
        assert_eq!(worker1.allocated_memory, Some(512 * 1024 * 1024));
        assert_eq!(hosts[1].arch, None);
        assert_eq!(hosts[1].physical_memory, None);
    }

    #[test]
    fn short_row_is_malformed() {
        assert!(matches!(
            parse_host("worker1 lx-amd64 8"),
            Err(OutputError::ColumnCount { actual: 3, .. })
        ));
    }
}
