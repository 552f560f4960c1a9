//! Job submission for admitted partitions
//!
//! For every partition: create the volume claim, create the job, wait for the claim to bind,
//! then flip the backing volume's reclaim policy to `Delete` so that removing the claim later
//! frees the storage too. The first failure aborts the remaining launches.

use super::naming::task_name;
use super::settle::poll_until;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::executor::{ClusterExecutor, JobSpec, ReclaimPolicy, VolumeSpec};
use std::sync::Arc;
use tracing::{debug, info};

pub struct JobLauncher {
    executor: Arc<dyn ClusterExecutor>,
    config: Arc<AppConfig>,
}

impl JobLauncher {
    pub fn new(executor: Arc<dyn ClusterExecutor>, config: Arc<AppConfig>) -> Self {
        Self { executor, config }
    }

    /// Launch in order, stopping at the first error. Returns the job names created (or, in
    /// simulate-only mode, the ones that would have been).
    pub async fn launch_all(&self, partitions: &[String]) -> Result<Vec<String>> {
        let mut launched = Vec::with_capacity(partitions.len());
        for partition in partitions {
            launched.push(self.launch(partition).await?);
        }
        Ok(launched)
    }

    pub async fn launch(&self, partition: &str) -> Result<String> {
        let name = task_name(partition);
        let volume = self.volume_spec(&name, partition);
        let job = self.job_spec(&name, partition);

        if self.config.dry_run {
            info!(
                "🔍 [dry-run] Would create PVC {} ({} of {}) and Job {} for {}",
                volume.name, volume.capacity, volume.storage_class, job.name, partition
            );
            return Ok(name);
        }

        info!("🗂️ Create PVC: {}", name);
        debug!("📝 {:?}", volume);
        self.executor.create_volume(&volume).await?;

        info!("🚀 Create Job: {}", name);
        debug!("📝 {:?}", job);
        self.executor.create_job(&job).await?;

        let backing_volume = self.wait_for_binding(&name).await?;
        info!("💾 PV: {}", backing_volume);

        info!("🩹 PV Patch: {}", backing_volume);
        self.executor
            .set_reclaim_policy(&backing_volume, ReclaimPolicy::Delete)
            .await?;

        Ok(name)
    }

    fn volume_spec(&self, name: &str, partition: &str) -> VolumeSpec {
        VolumeSpec {
            name: name.to_string(),
            partition: partition.to_string(),
            storage_class: self.config.storage.storage_class.clone(),
            capacity: self.config.storage.request.clone(),
        }
    }

    fn job_spec(&self, name: &str, partition: &str) -> JobSpec {
        JobSpec {
            name: name.to_string(),
            partition: partition.to_string(),
            worker: self.config.worker.clone(),
        }
    }

    /// Poll the claim until the executor reports its backing volume
    async fn wait_for_binding(&self, name: &str) -> Result<String> {
        let executor = &self.executor;
        let bound = poll_until(
            self.config.binding,
            &format!("PVC {} binding", name),
            move || async move { Ok(executor.get_volume(name).await?.bound_volume) },
        )
        .await?;

        bound.ok_or_else(|| AppError::VolumeBindingTimeout(name.to_string()))
    }
}
