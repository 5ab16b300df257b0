use crate::cmd::CommandResult;
use crate::entity::{Queue, SlotsDescription};
use crate::error::{OutputError, Result};
use crate::parser::fields::{content_lines, parse_value};
use crate::parser::require_success;

const QCONF: &str = "qconf";

const QNAME: &str = "qname";
const HOSTLIST: &str = "hostlist";
const USER_LISTS: &str = "user_lists";
const SLOTS: &str = "slots";
const NONE: &str = "NONE";

/// Queue names from `qconf -sql`, one per line.
pub fn parse_queue_names(result: &CommandResult) -> Result<Vec<String>> {
    require_success(result, QCONF)?;
    Ok(content_lines(&result.std_out)
        .map(|line| line.trim().to_string())
        .collect())
}

/// Join `\`-continued lines into logical `key value` lines.
fn logical_lines(lines: &[String]) -> Vec<String> {
    let mut joined = Vec::new();
    let mut current = String::new();
    for line in lines {
        let trimmed = line.trim();
        match trimmed.strip_suffix('\\') {
            Some(head) => {
                current.push_str(head.trim_end());
                current.push(' ');
            }
            None => {
                current.push_str(trimmed);
                if !current.trim().is_empty() {
                    joined.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }
    if !current.trim().is_empty() {
        joined.push(current);
    }
    joined
}

fn list_value(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != NONE)
        .map(str::to_string)
        .collect()
}

/// `1,[worker1=2],[worker2=4]`: per-host overrides in brackets after an
/// optional default. Without overrides only the default total is known.
pub fn parse_slots(value: &str) -> std::result::Result<SlotsDescription, OutputError> {
    let mut default = None;
    let mut per_host = Vec::new();
    let mut rest = value.trim();
    while !rest.is_empty() {
        if let Some(body) = rest.strip_prefix('[') {
            let end = body.find(']').ok_or_else(|| OutputError::InvalidValue {
                field: SLOTS.to_string(),
                value: value.to_string(),
            })?;
            let (host, count) = body[..end].split_once('=').ok_or_else(|| OutputError::InvalidValue {
                field: SLOTS.to_string(),
                value: value.to_string(),
            })?;
            per_host.push((host.trim().to_string(), parse_value(SLOTS, count)?));
            rest = body[end + 1..].trim_start_matches(',').trim_start();
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            default = Some(parse_value::<u32>(SLOTS, &rest[..end])?);
            rest = rest[end..].trim_start_matches(',').trim_start();
        }
    }

    if per_host.is_empty() {
        Ok(SlotsDescription::total(default.unwrap_or_default()))
    } else {
        Ok(SlotsDescription::from_hosts(per_host))
    }
}

/// Parse `qconf -sq` output: one block per queue, each starting at `qname`.
pub fn parse_queues(result: &CommandResult) -> Result<Vec<Queue>> {
    require_success(result, QCONF)?;
    let mut queues: Vec<Queue> = Vec::new();
    for line in logical_lines(&result.std_out) {
        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (line.as_str(), ""),
        };
        if key == QNAME {
            queues.push(Queue::named(value));
            continue;
        }
        let Some(queue) = queues.last_mut() else {
            return Err(OutputError::MissingKey {
                key: QNAME.to_string(),
                line: line.clone(),
            }
            .into());
        };
        match key {
            HOSTLIST => queue.hosts = list_value(value),
            USER_LISTS => queue.allowed_user_groups = list_value(value),
            SLOTS => queue.slots = Some(parse_slots(value)?),
            _ => {}
        }
    }
    Ok(queues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_with_overrides_sum_per_host() {
        let slots = parse_slots("1,[worker1=2],[worker2=4]").unwrap();
        assert_eq!(slots.total_slots, 6);
        assert_eq!(slots.per_host_slots["worker1"], 2);
    }

    #[test]
    fn slots_default_only() {
        let slots = parse_slots("8").unwrap();
        assert_eq!(slots.total_slots, 8);
        assert!(slots.per_host_slots.is_empty());
    }

    #[test]
    fn queue_blocks_with_continuations() {
        let result = CommandResult::new(
            0,
            [
                "qname                 all.q",
                "hostlist              worker1 worker2 \\",
                "                      worker3",
                "seq_no                0",
                "user_lists            NONE",
                "slots                 1,[worker1=2],[worker2=2], \\",
                "                      [worker3=4]",
                "qname                 gpu.q",
                "hostlist              @gpuhosts",
                "user_lists            ml,research",
                "slots                 4",
            ],
            Vec::<String>::new(),
        );
        let queues = parse_queues(&result).unwrap();
        assert_eq!(queues.len(), 2);
        assert_eq!(queues[0].name, "all.q");
        assert_eq!(queues[0].hosts, vec!["worker1", "worker2", "worker3"]);
        assert!(queues[0].allowed_user_groups.is_empty());
        assert_eq!(queues[0].slots.as_ref().unwrap().total_slots, 8);
        assert_eq!(queues[1].allowed_user_groups, vec!["ml", "research"]);
        assert_eq!(queues[1].slots, Some(SlotsDescription::total(4)));
    }

    #[test]
    fn attribute_before_qname_is_malformed() {
        let result = CommandResult::new(0, ["hostlist worker1"], Vec::<String>::new());
        assert!(parse_queues(&result).unwrap_err().is_malformed_output());
    }
}
