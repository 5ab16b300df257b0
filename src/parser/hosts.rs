//! Host-list expansion and comparison.
//!
//! Slurm reports node sets in compressed form: `worker[21-23]`,
//! `n[01-03,07],login1`. Partition updates compare the expanded, sorted sets
//! to detect a request that changes nothing.

use crate::error::OutputError;
use crate::parser::fields::parse_value;

/// Most hosts one bracket range may name.
const MAX_RANGE_HOSTS: u64 = 65_536;

/// Split a host list on commas that are not inside brackets.
pub fn split_host_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in list.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Expand one host token. `name[low-high]` yields one host per number in the
/// inclusive range, in ascending order, keeping the width of a zero-padded
/// `low`. A bracket may hold several comma-separated ranges or numbers. Other
/// tokens pass through trimmed. A range naming more than 65 536 hosts is
/// invalid.
pub fn expand_hosts(token: &str) -> Result<Vec<String>, OutputError> {
    let token = token.trim();
    let Some((name, rest)) = token.split_once('[') else {
        return Ok(vec![token.to_string()]);
    };
    let Some(body) = rest.strip_suffix(']') else {
        return Ok(vec![token.to_string()]);
    };
    if name.is_empty() || body.contains(&['[', ']'][..]) {
        return Ok(vec![token.to_string()]);
    }

    let mut hosts = Vec::new();
    for part in body.split(',').map(str::trim) {
        let (low, high) = part.split_once('-').unwrap_or((part, part));
        let width = if low.starts_with('0') { low.len() } else { 0 };
        let first: u64 = parse_value("host range", low)?;
        let last: u64 = parse_value("host range", high)?;
        if first > last || last - first >= MAX_RANGE_HOSTS {
            return Err(OutputError::InvalidValue {
                field: "host range".to_string(),
                value: token.to_string(),
            });
        }
        hosts.extend((first..=last).map(|n| format!("{name}{n:0width$}")));
    }
    Ok(hosts)
}

/// Expand every entry (each may itself be a comma list), then sort and
/// drop duplicates.
pub fn normalize_hosts<S: AsRef<str>>(hosts: &[S]) -> Result<Vec<String>, OutputError> {
    let mut expanded = Vec::new();
    for entry in hosts {
        for token in split_host_list(entry.as_ref()) {
            expanded.extend(expand_hosts(token)?);
        }
    }
    expanded.sort();
    expanded.dedup();
    Ok(expanded)
}

/// Whether two host lists name the same set once expanded.
pub fn same_hosts<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Result<bool, OutputError> {
    Ok(normalize_hosts(a)? == normalize_hosts(b)?)
}
