use std::collections::BTreeMap;

use crate::cmd::CommandResult;
use crate::entity::{Queue, SlotsDescription};
use crate::error::Result;
use crate::parser::fields::{content_lines, parse_value, split_fields};
use crate::parser::hosts::normalize_hosts;

const SINFO: &str = "sinfo";

/// `%R|%N|%c|%g`
const SINFO_FIELDS: usize = 4;
const GROUP_DELIMITER: char = ',';

/// `sinfo` and `scontrol` must exit cleanly and stay silent on stderr.
pub fn check_clean(result: &CommandResult, program: &str) -> Result<()> {
    if !result.success() || !result.std_err.is_empty() {
        return Err(result.failure(program));
    }
    Ok(())
}

struct PartitionLine<'a> {
    name: &'a str,
    nodes: &'a str,
    cpus: &'a str,
    groups: &'a str,
}

fn partition_lines(result: &CommandResult) -> Result<Vec<PartitionLine<'_>>> {
    check_clean(result, SINFO)?;
    content_lines(&result.std_out)
        .map(|line| -> Result<PartitionLine<'_>> {
            let fields = split_fields(line, '|', SINFO_FIELDS)?;
            Ok(PartitionLine {
                name: fields[0].trim_end_matches('*'),
                nodes: fields[1],
                cpus: fields[2],
                groups: fields[3],
            })
        })
        .collect()
}

/// Distinct partition names in the order `sinfo` first reports them.
pub fn parse_partition_names(result: &CommandResult) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for line in partition_lines(result)? {
        if !names.iter().any(|n| n == line.name) {
            names.push(line.name.to_string());
        }
    }
    Ok(names)
}

/// Full partition descriptions. `sinfo` prints one line per node state
/// within a partition, so lines of the same partition are merged. Every
/// node contributes its CPU count as slots.
pub fn parse_partitions(result: &CommandResult) -> Result<Vec<Queue>> {
    let mut order: Vec<String> = Vec::new();
    let mut hosts: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut slots: BTreeMap<String, Vec<(String, u32)>> = BTreeMap::new();

    for line in partition_lines(result)? {
        if !hosts.contains_key(line.name) {
            order.push(line.name.to_string());
        }
        let node_names = normalize_hosts(&[line.nodes])?;
        let cpus: u32 = parse_value("cpus", line.cpus.trim_end_matches('+'))?;

        slots
            .entry(line.name.to_string())
            .or_default()
            .extend(node_names.iter().map(|n| (n.clone(), cpus)));
        hosts
            .entry(line.name.to_string())
            .or_default()
            .extend(node_names);
        let known = groups.entry(line.name.to_string()).or_default();
        for group in line.groups.split(GROUP_DELIMITER).map(str::trim) {
            if !group.is_empty() && !known.iter().any(|g| g == group) {
                known.push(group.to_string());
            }
        }
    }

    Ok(order
        .into_iter()
        .map(|name| {
            let mut queue_hosts = hosts.remove(&name).unwrap_or_default();
            queue_hosts.sort();
            queue_hosts.dedup();
            Queue {
                hosts: queue_hosts,
                allowed_user_groups: groups.remove(&name).unwrap_or_default(),
                slots: Some(SlotsDescription::from_hosts(
                    slots.remove(&name).unwrap_or_default(),
                )),
                name,
            }
        })
        .collect())
}
