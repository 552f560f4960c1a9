//! Deterministic job and volume names
//!
//! A partition's job and its volume claim share one name derived purely from the partition
//! identifier. Distinct partitions may collapse onto the same name after sanitizing; that
//! collision is accepted, and within a run the first partition wins.

use std::collections::HashSet;
use tracing::warn;

pub const TASK_PREFIX: &str = "retire-";

/// Name for the job and volume claim of a partition
pub fn task_name(partition: &str) -> String {
    let sanitized: String = partition
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    format!("{}{}", TASK_PREFIX, sanitized)
}

/// Drop candidates whose task name was already claimed earlier in the list
pub fn dedup_by_task_name(candidates: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|partition| {
            let name = task_name(partition);
            if seen.insert(name.clone()) {
                true
            } else {
                warn!("⚠️ Deferring {}: task name {} already taken this run", partition, name);
                false
            }
        })
        .collect()
}
