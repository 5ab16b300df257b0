use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Slot capacity of a queue. When per-host detail is known, `total_slots` is
/// always the sum of `per_host_slots`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotsDescription {
    pub total_slots: u32,
    pub per_host_slots: BTreeMap<String, u32>,
}

impl SlotsDescription {
    /// Capacity known only as a total.
    pub fn total(total_slots: u32) -> Self {
        Self {
            total_slots,
            per_host_slots: BTreeMap::new(),
        }
    }

    /// Capacity built from per-host counts. A host listed twice keeps the last count.
    pub fn from_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let per_host_slots: BTreeMap<String, u32> =
            hosts.into_iter().map(|(h, n)| (h.into(), n)).collect();
        Self {
            total_slots: per_host_slots.values().sum(),
            per_host_slots,
        }
    }
}

/// A Slurm partition or SGE cluster queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    pub name: String,
    pub hosts: Vec<String>,
    pub allowed_user_groups: Vec<String>,
    pub slots: Option<SlotsDescription>,
}

impl Queue {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
