#![allow(dead_code)]

// Test utilities and common setup
pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

use index_retirer::{AppConfig, RetentionScheduler};
use std::sync::Arc;

/// Scheduler wired to in-memory collaborators
pub struct TestEnvironment {
    pub executor: Arc<MockClusterExecutor>,
    pub notifier: Arc<RecordingNotifier>,
    pub scheduler: RetentionScheduler,
}

impl TestEnvironment {
    pub fn new(config: AppConfig, partitions: &[&str]) -> Self {
        Self::with_catalog(config, MockCatalog::new(partitions))
    }

    pub fn with_catalog(config: AppConfig, catalog: MockCatalog) -> Self {
        Self::with_notifier(config, catalog, RecordingNotifier::new())
    }

    pub fn with_notifier(
        config: AppConfig,
        catalog: MockCatalog,
        notifier: RecordingNotifier,
    ) -> Self {
        let executor = Arc::new(MockClusterExecutor::new());
        let notifier = Arc::new(notifier);
        let scheduler = RetentionScheduler::new(
            Arc::new(config),
            Arc::new(catalog),
            executor.clone(),
            notifier.clone(),
        );
        Self {
            executor,
            notifier,
            scheduler,
        }
    }
}
