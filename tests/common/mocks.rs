use async_trait::async_trait;
use index_retirer::catalog::PartitionCatalog;
use index_retirer::executor::{
    ClusterExecutor, JobCondition, JobOutcome, JobSpec, ManagedJob, ManagedVolume, ReclaimPolicy,
    VolumeSpec, WorkerPhase, WorkerProcess,
};
use index_retirer::notify::Notifier;
use index_retirer::{AppError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cluster contents as the mock executor sees them
#[derive(Debug, Default)]
pub struct ClusterState {
    pub jobs: BTreeMap<String, ManagedJob>,
    pub volumes: BTreeMap<String, ManagedVolume>,
    pub workers: BTreeMap<String, WorkerProcess>,
    pub reclaim_policies: HashMap<String, ReclaimPolicy>,
}

/// In-memory executor recording every mutating call
pub struct MockClusterExecutor {
    state: Arc<RwLock<ClusterState>>,
    calls: Arc<RwLock<Vec<String>>>,
    bind_on_create: Arc<RwLock<bool>>,
    fail_listing: Arc<RwLock<bool>>,
    fail_job_fetch: Arc<RwLock<bool>>,
    fail_deletes: Arc<RwLock<bool>>,
    fail_job_create_for: Arc<RwLock<Option<String>>>,
}

impl MockClusterExecutor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ClusterState::default())),
            calls: Arc::new(RwLock::new(Vec::new())),
            bind_on_create: Arc::new(RwLock::new(true)),
            fail_listing: Arc::new(RwLock::new(false)),
            fail_job_fetch: Arc::new(RwLock::new(false)),
            fail_deletes: Arc::new(RwLock::new(false)),
            fail_job_create_for: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn add_job(&self, name: &str, partition: Option<&str>, outcome: JobOutcome) {
        let conditions = match outcome {
            JobOutcome::Ongoing => vec![],
            JobOutcome::Complete => vec![JobCondition::new("Complete", true)],
            JobOutcome::Failed => vec![
                JobCondition::new("Complete", false),
                JobCondition::new("Failed", true),
            ],
        };
        self.state.write().await.jobs.insert(
            name.to_string(),
            ManagedJob {
                name: name.to_string(),
                partition: partition.map(str::to_string),
                conditions,
                created_at: None,
            },
        );
    }

    pub async fn add_volume(&self, name: &str, bound_volume: Option<&str>) {
        self.state.write().await.volumes.insert(
            name.to_string(),
            ManagedVolume {
                name: name.to_string(),
                partition: None,
                storage_class: Some("local-path".to_string()),
                capacity: Some("200Gi".to_string()),
                bound_volume: bound_volume.map(str::to_string),
            },
        );
    }

    pub async fn add_worker(&self, name: &str, phase: WorkerPhase) {
        self.state.write().await.workers.insert(
            name.to_string(),
            WorkerProcess {
                name: name.to_string(),
                phase,
            },
        );
    }

    pub async fn set_bind_on_create(&self, bind: bool) {
        *self.bind_on_create.write().await = bind;
    }

    pub async fn set_fail_listing(&self, fail: bool) {
        *self.fail_listing.write().await = fail;
    }

    pub async fn set_fail_job_fetch(&self, fail: bool) {
        *self.fail_job_fetch.write().await = fail;
    }

    pub async fn set_fail_deletes(&self, fail: bool) {
        *self.fail_deletes.write().await = fail;
    }

    pub async fn fail_job_create_for(&self, name: &str) {
        *self.fail_job_create_for.write().await = Some(name.to_string());
    }

    /// Mutating calls in order, formatted as `operation:name`
    pub async fn mutations(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self, call: &str) -> usize {
        self.calls.read().await.iter().filter(|c| *c == call).count()
    }

    pub async fn has_job(&self, name: &str) -> bool {
        self.state.read().await.jobs.contains_key(name)
    }

    pub async fn has_volume(&self, name: &str) -> bool {
        self.state.read().await.volumes.contains_key(name)
    }

    pub async fn has_worker(&self, name: &str) -> bool {
        self.state.read().await.workers.contains_key(name)
    }

    pub async fn volume(&self, name: &str) -> Option<ManagedVolume> {
        self.state.read().await.volumes.get(name).cloned()
    }

    pub async fn job_names(&self) -> Vec<String> {
        self.state.read().await.jobs.keys().cloned().collect()
    }

    pub async fn reclaim_policy(&self, backing_volume: &str) -> Option<ReclaimPolicy> {
        self.state
            .read()
            .await
            .reclaim_policies
            .get(backing_volume)
            .copied()
    }

    async fn record(&self, operation: &str, name: &str) {
        self.calls.write().await.push(format!("{}:{}", operation, name));
    }

    async fn check_listing(&self) -> Result<()> {
        if *self.fail_listing.read().await {
            return Err(AppError::KubernetesError("API server unavailable".to_string()));
        }
        Ok(())
    }

    async fn check_delete(&self, name: &str) -> Result<()> {
        if *self.fail_deletes.read().await {
            return Err(AppError::KubernetesError(format!("delete {} refused", name)));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterExecutor for MockClusterExecutor {
    async fn list_jobs(&self) -> Result<Vec<ManagedJob>> {
        self.check_listing().await?;
        Ok(self.state.read().await.jobs.values().cloned().collect())
    }

    async fn get_job(&self, name: &str) -> Result<ManagedJob> {
        if *self.fail_job_fetch.read().await {
            return Err(AppError::KubernetesError(format!(
                "get job {}: connection reset by peer",
                name
            )));
        }
        self.state
            .read()
            .await
            .jobs
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("job {}", name)))
    }

    async fn create_job(&self, spec: &JobSpec) -> Result<()> {
        self.record("create_job", &spec.name).await;
        if self.fail_job_create_for.read().await.as_deref() == Some(spec.name.as_str()) {
            return Err(AppError::KubernetesError(format!("quota exceeded for {}", spec.name)));
        }

        let mut state = self.state.write().await;
        if state.jobs.contains_key(&spec.name) {
            return Err(AppError::KubernetesError(format!(
                "jobs.batch \"{}\" already exists",
                spec.name
            )));
        }
        state.jobs.insert(
            spec.name.clone(),
            ManagedJob {
                name: spec.name.clone(),
                partition: Some(spec.partition.clone()),
                conditions: vec![],
                created_at: None,
            },
        );
        Ok(())
    }

    async fn delete_job(&self, name: &str) -> Result<()> {
        self.record("delete_job", name).await;
        self.check_delete(name).await?;
        self.state
            .write()
            .await
            .jobs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("job {}", name)))
    }

    async fn list_volumes(&self) -> Result<Vec<ManagedVolume>> {
        self.check_listing().await?;
        Ok(self.state.read().await.volumes.values().cloned().collect())
    }

    async fn get_volume(&self, name: &str) -> Result<ManagedVolume> {
        self.state
            .read()
            .await
            .volumes
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("pvc {}", name)))
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<()> {
        self.record("create_volume", &spec.name).await;
        let bound_volume = if *self.bind_on_create.read().await {
            Some(format!("pv-{}", spec.name))
        } else {
            None
        };

        let mut state = self.state.write().await;
        if state.volumes.contains_key(&spec.name) {
            return Err(AppError::KubernetesError(format!(
                "persistentvolumeclaims \"{}\" already exists",
                spec.name
            )));
        }
        state.volumes.insert(
            spec.name.clone(),
            ManagedVolume {
                name: spec.name.clone(),
                partition: Some(spec.partition.clone()),
                storage_class: Some(spec.storage_class.clone()),
                capacity: Some(spec.capacity.clone()),
                bound_volume,
            },
        );
        Ok(())
    }

    async fn delete_volume(&self, name: &str) -> Result<()> {
        self.record("delete_volume", name).await;
        self.check_delete(name).await?;
        self.state
            .write()
            .await
            .volumes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("pvc {}", name)))
    }

    async fn list_workers(&self) -> Result<Vec<WorkerProcess>> {
        self.check_listing().await?;
        Ok(self.state.read().await.workers.values().cloned().collect())
    }

    async fn delete_worker(&self, name: &str) -> Result<()> {
        self.record("delete_worker", name).await;
        self.check_delete(name).await?;
        self.state.write().await.workers.remove(name);
        Ok(())
    }

    async fn set_reclaim_policy(&self, backing_volume: &str, policy: ReclaimPolicy) -> Result<()> {
        self.record("set_reclaim_policy", backing_volume).await;
        self.state
            .write()
            .await
            .reclaim_policies
            .insert(backing_volume.to_string(), policy);
        Ok(())
    }
}

/// Catalog returning a fixed partition list
pub struct MockCatalog {
    partitions: Vec<String>,
    should_fail: bool,
}

impl MockCatalog {
    pub fn new(partitions: &[&str]) -> Self {
        Self {
            partitions: partitions.iter().map(|p| p.to_string()).collect(),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            partitions: Vec::new(),
            should_fail: true,
        }
    }
}

#[async_trait]
impl PartitionCatalog for MockCatalog {
    async fn list_partitions(&self) -> Result<Vec<String>> {
        if self.should_fail {
            return Err(AppError::CatalogError("connection refused".to_string()));
        }
        Ok(self.partitions.clone())
    }
}

/// Notifier keeping every message it was asked to send
pub struct RecordingNotifier {
    messages: Arc<RwLock<Vec<String>>>,
    should_fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        self.messages.write().await.push(text.to_string());
        if self.should_fail {
            return Err(AppError::NotificationError("sink unavailable".to_string()));
        }
        Ok(())
    }
}
