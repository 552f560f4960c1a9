//! Lifecycle reconciliation of scheduler-owned resources
//!
//! One pass over the cluster, in this order:
//!
//! 1. volume claims whose job no longer exists are deleted,
//! 2. worker pods that already succeeded are deleted,
//! 3. jobs are classified; terminal ones are announced and removed along with their claim,
//!    ongoing ones are reported back so their partitions are not submitted again.
//!
//! Listing and fetching failures abort the pass. Deletion failures are logged and left for
//! the next run to converge. In simulate-only mode terminal jobs are reported but neither
//! removed nor announced, so repeated dry runs do not notify twice for the same job.

use super::naming::task_name;
use super::settle::poll_until;
use crate::config::PollSettings;
use crate::error::Result;
use crate::executor::{ClusterExecutor, JobOutcome, ManagedJob, WorkerPhase};
use crate::notify::{outcome_message, NotificationDispatch};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default, Clone)]
pub struct ReconcileOutcome {
    pub ongoing: Vec<ManagedJob>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub orphaned_volumes: Vec<String>,
    pub reaped_workers: Vec<String>,
}

impl ReconcileOutcome {
    pub fn ongoing_count(&self) -> usize {
        self.ongoing.len()
    }

    /// Remove candidates that already have a job in flight, matched either by derived
    /// task name or by the job's partition annotation
    pub fn exclude_in_flight(&self, candidates: Vec<String>) -> Vec<String> {
        candidates
            .into_iter()
            .filter(|candidate| {
                let name = task_name(candidate);
                !self.ongoing.iter().any(|job| {
                    job.name == name || job.partition.as_deref() == Some(candidate.as_str())
                })
            })
            .collect()
    }
}

pub struct LifecycleReconciler {
    executor: Arc<dyn ClusterExecutor>,
    dry_run: bool,
    settle: PollSettings,
}

impl LifecycleReconciler {
    pub fn new(executor: Arc<dyn ClusterExecutor>, dry_run: bool, settle: PollSettings) -> Self {
        Self {
            executor,
            dry_run,
            settle,
        }
    }

    pub async fn reconcile(&self, dispatch: &mut NotificationDispatch) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome {
            orphaned_volumes: self.sweep_orphan_volumes().await?,
            reaped_workers: self.reap_succeeded_workers().await?,
            ..Default::default()
        };

        for job in self.executor.list_jobs().await? {
            match job.outcome() {
                JobOutcome::Ongoing => {
                    info!("🔄 Saw Ongoing: {}", job.name);
                    outcome.ongoing.push(job);
                }
                terminal => {
                    if terminal == JobOutcome::Failed {
                        info!("❌ Saw Failed: {}", job.name);
                        outcome.failed.push(job.name.clone());
                    } else {
                        info!("✅ Saw Complete: {}", job.name);
                        outcome.completed.push(job.name.clone());
                    }
                    if self.dry_run {
                        info!("🔍 [dry-run] Would notify and delete Job and PVC: {}", job.name);
                        continue;
                    }
                    dispatch.send(outcome_message(terminal, &job.name));
                    self.remove_finished(&job.name).await;
                }
            }
        }

        info!(
            "📊 Reconciled: {} ongoing, {} complete, {} failed",
            outcome.ongoing.len(),
            outcome.completed.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    /// Delete claims whose same-named job is gone
    async fn sweep_orphan_volumes(&self) -> Result<Vec<String>> {
        let mut orphans = Vec::new();

        for volume in self.executor.list_volumes().await? {
            match self.executor.get_job(&volume.name).await {
                Ok(_) => continue,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }

            info!("🧹 Found Orphan PVC: {}", volume.name);
            orphans.push(volume.name.clone());

            if self.dry_run {
                info!("🔍 [dry-run] Would delete PVC: {}", volume.name);
                continue;
            }

            match self.executor.delete_volume(&volume.name).await {
                Ok(()) => self.wait_volume_released(&volume.name).await,
                Err(e) => warn!("⚠️ Failed to delete orphan PVC {}: {}", volume.name, e),
            }
        }

        Ok(orphans)
    }

    /// Delete worker pods left behind in the `Succeeded` phase
    async fn reap_succeeded_workers(&self) -> Result<Vec<String>> {
        let mut reaped = Vec::new();

        for worker in self.executor.list_workers().await? {
            if worker.phase != WorkerPhase::Succeeded {
                continue;
            }

            info!("🧹 Found Succeeded Pod: {}", worker.name);
            reaped.push(worker.name.clone());

            if self.dry_run {
                info!("🔍 [dry-run] Would delete Pod: {}", worker.name);
                continue;
            }

            if let Err(e) = self.executor.delete_worker(&worker.name).await {
                warn!("⚠️ Failed to delete pod {}: {}", worker.name, e);
            }
        }

        Ok(reaped)
    }

    /// Delete a terminal job and its claim
    async fn remove_finished(&self, name: &str) {
        info!("🗑️ Delete Job: {}", name);
        if let Err(e) = self.executor.delete_job(name).await {
            warn!("⚠️ Failed to delete job {}: {}", name, e);
        }

        info!("🗑️ Delete PVC: {}", name);
        match self.executor.delete_volume(name).await {
            Ok(()) => self.wait_volume_released(name).await,
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!("⚠️ Failed to delete PVC {}: {}", name, e),
        }
    }

    /// Give an asynchronous claim deletion time to finish
    async fn wait_volume_released(&self, name: &str) {
        let executor = &self.executor;
        let what = format!("PVC {} deletion", name);
        let released = poll_until(self.settle, &what, move || async move {
            match executor.get_volume(name).await {
                Ok(_) => Ok(None),
                Err(e) if e.is_not_found() => Ok(Some(())),
                Err(e) => Err(e),
            }
        })
        .await;

        match released {
            Ok(Some(())) => info!("✅ PVC released: {}", name),
            Ok(None) => warn!("⚠️ PVC {} still present after settle window", name),
            Err(e) => warn!("⚠️ Could not confirm PVC {} deletion: {}", name, e),
        }
    }
}
