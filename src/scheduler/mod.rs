//! Retirement scheduler
//!
//! A run is a pure function of what the catalog and the cluster report right now:
//! select eligible partitions, order them, reconcile existing jobs, compute free slots and
//! launch jobs for the head of the queue. Nothing is persisted between runs.

pub mod launcher;
pub mod naming;
pub mod reconciler;
pub mod settle;
pub mod slots;

pub use launcher::JobLauncher;
pub use naming::{dedup_by_task_name, task_name, TASK_PREFIX};
pub use reconciler::{LifecycleReconciler, ReconcileOutcome};
pub use slots::{Admission, SlotAllocator};

use crate::catalog::PartitionCatalog;
use crate::config::AppConfig;
use crate::error::Result;
use crate::executor::ClusterExecutor;
use crate::notify::{NotificationDispatch, Notifier};
use crate::partition::{self, EligibilitySelector, PriorityPolicy};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Summary of one scheduler pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub eligible: Vec<String>,
    pub ongoing: Vec<String>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub orphaned_volumes: Vec<String>,
    pub reaped_workers: Vec<String>,
    pub free_slots: usize,
    /// Partitions a job was submitted for, in submission order
    pub launched: Vec<String>,
    /// Eligible partitions left for a later run
    pub deferred: Vec<String>,
}

pub struct RetentionScheduler {
    config: Arc<AppConfig>,
    catalog: Arc<dyn PartitionCatalog>,
    executor: Arc<dyn ClusterExecutor>,
    notifier: Arc<dyn Notifier>,
}

impl RetentionScheduler {
    pub fn new(
        config: Arc<AppConfig>,
        catalog: Arc<dyn PartitionCatalog>,
        executor: Arc<dyn ClusterExecutor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            catalog,
            executor,
            notifier,
        }
    }

    /// Run one pass against the local calendar day
    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(partition::today()).await
    }

    /// Run one pass treating `today` as the current day
    pub async fn run_at(&self, today: NaiveDate) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, dry_run = self.config.dry_run);

        async {
            let mut dispatch = NotificationDispatch::new(Arc::clone(&self.notifier));
            let result = self.execute(run_id, today, &mut dispatch).await;
            dispatch.flush().await;
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        today: NaiveDate,
        dispatch: &mut NotificationDispatch,
    ) -> Result<RunReport> {
        let mut report = RunReport {
            run_id,
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        let catalog = self.catalog.list_partitions().await?;
        let mut candidates = EligibilitySelector::new(self.config.keep_days).select(catalog, today);
        PriorityPolicy::new(&self.config.deferred_patterns).sort(&mut candidates);
        report.eligible = candidates.clone();

        let reconciler = LifecycleReconciler::new(
            Arc::clone(&self.executor),
            self.config.dry_run,
            self.config.settle,
        );
        let outcome = reconciler.reconcile(dispatch).await?;

        report.ongoing = outcome.ongoing.iter().map(|j| j.name.clone()).collect();
        report.completed = outcome.completed.clone();
        report.failed = outcome.failed.clone();
        report.orphaned_volumes = outcome.orphaned_volumes.clone();
        report.reaped_workers = outcome.reaped_workers.clone();

        let candidates = dedup_by_task_name(outcome.exclude_in_flight(candidates));
        let admission =
            SlotAllocator::new(self.config.max_tasks).admit(candidates, outcome.ongoing_count());
        report.free_slots = admission.free_slots;
        report.deferred = admission.deferred;

        if admission.free_slots == 0 {
            info!("🛑 No free slots, nothing to launch");
            return Ok(report);
        }

        info!("📋 Indices: {}", admission.admitted.join(", "));
        JobLauncher::new(Arc::clone(&self.executor), Arc::clone(&self.config))
            .launch_all(&admission.admitted)
            .await?;
        report.launched = admission.admitted;

        Ok(report)
    }
}
