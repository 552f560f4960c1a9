//! Eligibility selection over the live partition catalog

use super::clock::{age_days, date_from_index};
use chrono::NaiveDate;
use tracing::{debug, info};

/// Filters catalog entries down to partitions old enough to retire
#[derive(Debug, Clone)]
pub struct EligibilitySelector {
    min_age_days: i64,
}

impl EligibilitySelector {
    pub fn new(min_age_days: i64) -> Self {
        Self { min_age_days }
    }

    /// Whether a single identifier is a retirement candidate as of `today`
    pub fn is_eligible(&self, index: &str, today: NaiveDate) -> bool {
        if index.starts_with('.') {
            return false;
        }
        match date_from_index(index) {
            Some(date) => age_days(today, date) >= self.min_age_days,
            None => false,
        }
    }

    /// Keep the eligible identifiers, preserving catalog order
    pub fn select<I, S>(&self, catalog: I, today: NaiveDate) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut candidates = Vec::new();
        for index in catalog {
            let index = index.into();
            if self.is_eligible(&index, today) {
                info!("📦 Candidate: {}", index);
                candidates.push(index);
            } else {
                debug!("⏭️ Skipping partition: {}", index);
            }
        }
        candidates
    }
}
