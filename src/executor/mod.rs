//! Cluster executor seam
//!
//! The scheduler only ever talks to the cluster through [`ClusterExecutor`]. Every listing
//! is scoped to resources carrying the ownership label, and every single-resource call is
//! addressed by exact name.

pub mod kubectl;
pub mod manifest;

pub use kubectl::KubectlExecutor;
pub use manifest::KubernetesManifests;

use crate::config::WorkerTemplate;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label put on every job, volume claim and pod this scheduler creates
pub const OWNER_LABEL_KEY: &str = "app.kubernetes.io/managed-by";
pub const OWNER_LABEL_VALUE: &str = "index-retirer";
/// Annotation carrying the unsanitized partition identifier
pub const PARTITION_ANNOTATION_KEY: &str = "index-retirer.io/partition";

/// `key=value` selector matching resources owned by this scheduler
pub fn owner_selector() -> String {
    format!("{}={}", OWNER_LABEL_KEY, OWNER_LABEL_VALUE)
}

/// Job condition as reported by the executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCondition {
    pub condition_type: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl JobCondition {
    pub fn new(condition_type: &str, status: bool) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            reason: None,
            message: None,
        }
    }

    pub fn is_true(&self, condition_type: &str) -> bool {
        self.condition_type == condition_type && self.status.eq_ignore_ascii_case("true")
    }
}

/// Lifecycle phase of a job as observed through its conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Ongoing,
    Complete,
    Failed,
}

impl JobOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobOutcome::Ongoing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedJob {
    pub name: String,
    /// Original partition identifier, from the partition annotation
    pub partition: Option<String>,
    pub conditions: Vec<JobCondition>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ManagedJob {
    /// `Failed=True` wins over `Complete=True`; anything else is still ongoing
    pub fn outcome(&self) -> JobOutcome {
        if self.conditions.iter().any(|c| c.is_true("Failed")) {
            JobOutcome::Failed
        } else if self.conditions.iter().any(|c| c.is_true("Complete")) {
            JobOutcome::Complete
        } else {
            JobOutcome::Ongoing
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedVolume {
    pub name: String,
    pub partition: Option<String>,
    pub storage_class: Option<String>,
    pub capacity: Option<String>,
    /// Backing volume, filled in by the executor once the claim binds
    pub bound_volume: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl WorkerPhase {
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => WorkerPhase::Pending,
            "Running" => WorkerPhase::Running,
            "Succeeded" => WorkerPhase::Succeeded,
            "Failed" => WorkerPhase::Failed,
            _ => WorkerPhase::Unknown,
        }
    }
}

/// Worker process (pod) spawned for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProcess {
    pub name: String,
    pub phase: WorkerPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReclaimPolicy {
    Delete,
    Retain,
}

impl ReclaimPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReclaimPolicy::Delete => "Delete",
            ReclaimPolicy::Retain => "Retain",
        }
    }
}

/// Volume claim to create for a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    pub name: String,
    pub partition: String,
    pub storage_class: String,
    pub capacity: String,
}

/// Batch job to create for a partition
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,
    pub partition: String,
    pub worker: WorkerTemplate,
}

#[async_trait]
pub trait ClusterExecutor: Send + Sync {
    async fn list_jobs(&self) -> Result<Vec<ManagedJob>>;

    /// Fails with `AppError::NotFound` when no job has that name
    async fn get_job(&self, name: &str) -> Result<ManagedJob>;

    async fn create_job(&self, spec: &JobSpec) -> Result<()>;

    async fn delete_job(&self, name: &str) -> Result<()>;

    async fn list_volumes(&self) -> Result<Vec<ManagedVolume>>;

    /// Fails with `AppError::NotFound` when no volume claim has that name
    async fn get_volume(&self, name: &str) -> Result<ManagedVolume>;

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<()>;

    async fn delete_volume(&self, name: &str) -> Result<()>;

    async fn list_workers(&self) -> Result<Vec<WorkerProcess>>;

    async fn delete_worker(&self, name: &str) -> Result<()>;

    async fn set_reclaim_policy(&self, backing_volume: &str, policy: ReclaimPolicy) -> Result<()>;
}
