//! Partition date extraction and age arithmetic
//!
//! Partitions carry their date as a trailing `YYYY?MM?DD` segment where `?` is one of
//! `.`, `_`, `-` or nothing. All arithmetic is done on calendar days so callers can pass
//! an explicit "today" instead of reading the wall clock.

use chrono::{Local, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

fn index_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([0-9]{4})[._-]?([0-9]{2})[._-]?([0-9]{2})$")
            .expect("partition date pattern is a valid regex")
    })
}

/// Extract the trailing calendar date of a partition identifier.
///
/// Only the last `/`-separated segment is inspected. Returns `None` when the name has no
/// trailing date or the digits do not form a real calendar date.
pub fn date_from_index(index: &str) -> Option<NaiveDate> {
    let base = index.rsplit('/').next().unwrap_or(index);
    let captures = index_date_pattern().captures(base)?;

    let year: i32 = captures.get(1)?.as_str().parse().ok()?;
    let month: u32 = captures.get(2)?.as_str().parse().ok()?;
    let day: u32 = captures.get(3)?.as_str().parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// The process-local calendar day, i.e. local midnight
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Whole days elapsed between `date` and `today`; negative for future dates
pub fn age_days(today: NaiveDate, date: NaiveDate) -> i64 {
    today.signed_duration_since(date).num_days()
}
