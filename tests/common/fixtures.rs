use chrono::NaiveDate;
use index_retirer::config::PollSettings;
use index_retirer::AppConfig;
use std::time::Duration;

/// The "today" every scheduler test runs against
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()
}

/// Config with a 30 day threshold, budget of 4 and millisecond polling
pub fn test_config() -> AppConfig {
    AppConfig {
        keep_days: 30,
        max_tasks: 4,
        deferred_patterns: vec!["prod".to_string()],
        binding: PollSettings::new(Duration::from_millis(1), Duration::from_millis(3)),
        settle: PollSettings::new(Duration::from_millis(1), Duration::from_millis(3)),
        ..AppConfig::default()
    }
}

pub fn dry_run_config() -> AppConfig {
    AppConfig {
        dry_run: true,
        ..test_config()
    }
}
