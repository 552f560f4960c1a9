//! Retirement ordering
//!
//! Partitions matching a deferred-class pattern (production data, typically) always sort
//! after every other partition. Inside a class the order is:
//!
//! 1. dated partitions before undated ones,
//! 2. dated partitions by ascending date (oldest first), equal dates by ascending name,
//! 3. undated partitions by descending name.
//!
//! This is a total order, so sorting is deterministic for any input.

use super::clock::date_from_index;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default)]
pub struct PriorityPolicy {
    deferred_patterns: Vec<String>,
}

impl PriorityPolicy {
    /// Patterns are matched as case-insensitive substrings
    pub fn new<I, S>(deferred_patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            deferred_patterns: deferred_patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn is_deferred(&self, index: &str) -> bool {
        let lower = index.to_lowercase();
        self.deferred_patterns.iter().any(|p| lower.contains(p.as_str()))
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.is_deferred(a)
            .cmp(&self.is_deferred(b))
            .then_with(|| match (date_from_index(a), date_from_index(b)) {
                (Some(da), Some(db)) => da.cmp(&db).then_with(|| a.cmp(b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => b.cmp(a),
            })
    }

    /// Sort in place, head of the slice is retired first
    pub fn sort(&self, indices: &mut [String]) {
        indices.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DEFERRED_PATTERNS;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_deferred_class_sorts_last_then_oldest_first() {
        let policy = PriorityPolicy::new(["prod"]);
        let mut indices = strings(&[
            "a-test-2021-02-02",
            "b-prod-2021-02-02",
            "c-test-2021-01-02",
            "d-prod-2021-01-02",
        ]);

        policy.sort(&mut indices);

        assert_eq!(
            indices,
            strings(&[
                "c-test-2021-01-02",
                "a-test-2021-02-02",
                "d-prod-2021-01-02",
                "b-prod-2021-02-02",
            ])
        );
    }

    #[test]
    fn test_deferred_match_is_case_insensitive() {
        let policy = PriorityPolicy::new(["PROD"]);
        assert!(policy.is_deferred("Access-Prod-2021-01-01"));
        assert!(!policy.is_deferred("access-test-2021-01-01"));
    }

    #[test]
    fn test_default_patterns() {
        let policy = PriorityPolicy::new(DEFAULT_DEFERRED_PATTERNS);
        assert!(policy.is_deferred("info-prod-2021-01-01"));
        assert!(policy.is_deferred("access-production-2021-01-01"));
        assert!(policy.is_deferred("billing-prod-2021-01-01"));
        assert!(!policy.is_deferred("production-notes-2021-01-01"));
        assert!(!policy.is_deferred("info-test-2021-01-01"));
    }

    #[test]
    fn test_equal_dates_break_ties_by_name() {
        let policy = PriorityPolicy::default();
        let mut indices = strings(&["z-2021-01-01", "a-2021.01.01", "m-20201231"]);
        policy.sort(&mut indices);
        assert_eq!(indices, strings(&["m-20201231", "a-2021.01.01", "z-2021-01-01"]));
    }

    #[test]
    fn test_undated_entries_follow_dated_in_reverse_name_order() {
        let policy = PriorityPolicy::default();
        let mut indices = strings(&["alpha", "b-2021-01-01", "omega", "a-2022-01-01"]);
        policy.sort(&mut indices);
        assert_eq!(
            indices,
            strings(&["b-2021-01-01", "a-2022-01-01", "omega", "alpha"])
        );
    }

    #[test]
    fn test_sort_is_independent_of_input_order() {
        let policy = PriorityPolicy::new(["prod"]);
        let mut forward = strings(&[
            "x-prod-2021-01-03",
            "y-2021-01-02",
            "undated",
            "w-2021-01-01",
        ]);
        let mut backward: Vec<String> = forward.iter().rev().cloned().collect();
        policy.sort(&mut forward);
        policy.sort(&mut backward);
        assert_eq!(forward, backward);
        assert_eq!(forward.last().map(String::as_str), Some("x-prod-2021-01-03"));
    }
}
