//! `kubectl`-backed cluster executor
//!
//! Every call shells out to kubectl with JSON output and parses the result. Listings are
//! filtered by the ownership label, so resources created by anything else in the namespace
//! are invisible to the scheduler.

use super::{
    owner_selector, ClusterExecutor, JobCondition, JobSpec, KubernetesManifests, ManagedJob,
    ManagedVolume, ReclaimPolicy, VolumeSpec, WorkerPhase, WorkerProcess,
    PARTITION_ANNOTATION_KEY,
};
use crate::config::KubectlConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

pub struct KubectlExecutor {
    config: KubectlConfig,
}

impl KubectlExecutor {
    pub fn new(config: KubectlConfig) -> Self {
        Self { config }
    }

    fn command(&self, args: &[&str], namespaced: bool) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        if let Some(kubeconfig) = &self.config.kubeconfig {
            cmd.args(["--kubeconfig", kubeconfig.as_str()]);
        }
        if namespaced {
            cmd.args(["-n", self.config.namespace.as_str()]);
        }
        cmd.args(args);
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run kubectl and return its stdout. `target` names the single resource the command
    /// addresses; only a NotFound for that exact name maps to `AppError::NotFound`.
    async fn run(&self, args: &[&str], namespaced: bool, target: Option<&str>) -> Result<String> {
        debug!("☸️ kubectl {}", args.join(" "));

        let output = self
            .command(args, namespaced)
            .output()
            .await
            .map_err(|e| AppError::KubernetesError(format!("Failed to spawn kubectl: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&args.join(" "), target, &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Fetch one resource as JSON; `None` when the server reports no such object
    async fn get_named(&self, kind: &str, name: &str) -> Result<Option<String>> {
        let json = self
            .run(
                &["get", kind, name, "--ignore-not-found", "-o", "json"],
                true,
                Some(name),
            )
            .await?;
        Ok(missing_if_empty(json))
    }

    /// Pipe a manifest into `kubectl create -f -`
    async fn create_from_yaml(&self, yaml: &str) -> Result<String> {
        let mut cmd = self.command(&["create", "-f", "-"], true);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            AppError::KubernetesError(format!("Failed to spawn kubectl create: {}", e))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(yaml.as_bytes()).await.map_err(|e| {
                AppError::KubernetesError(format!("Failed to write YAML to kubectl: {}", e))
            })?;
            stdin.shutdown().await.map_err(|e| {
                AppError::KubernetesError(format!("Failed to close kubectl stdin: {}", e))
            })?;
        }

        let output = child.wait_with_output().await.map_err(|e| {
            AppError::KubernetesError(format!("Failed to wait for kubectl create: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("❌ kubectl create failed: {}", stderr.trim());
            return Err(classify_failure("create -f -", None, &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ClusterExecutor for KubectlExecutor {
    async fn list_jobs(&self) -> Result<Vec<ManagedJob>> {
        let selector = owner_selector();
        let json = self
            .run(&["get", "jobs", "-l", &selector, "-o", "json"], true, None)
            .await?;
        parse_job_list(&json)
    }

    async fn get_job(&self, name: &str) -> Result<ManagedJob> {
        match self.get_named("job", name).await? {
            Some(json) => parse_job(&json),
            None => Err(AppError::NotFound(format!("job {}", name))),
        }
    }

    async fn create_job(&self, spec: &JobSpec) -> Result<()> {
        let yaml = KubernetesManifests::generate_job_yaml(spec, &self.config.namespace)?;
        let out = self.create_from_yaml(&yaml).await?;
        info!("🚀 {}", out.trim());
        Ok(())
    }

    async fn delete_job(&self, name: &str) -> Result<()> {
        self.run(&["delete", "job", name, "--wait=false"], true, Some(name))
            .await
            .map(|_| ())
    }

    async fn list_volumes(&self) -> Result<Vec<ManagedVolume>> {
        let selector = owner_selector();
        let json = self
            .run(&["get", "pvc", "-l", &selector, "-o", "json"], true, None)
            .await?;
        parse_volume_list(&json)
    }

    async fn get_volume(&self, name: &str) -> Result<ManagedVolume> {
        match self.get_named("pvc", name).await? {
            Some(json) => parse_volume(&json),
            None => Err(AppError::NotFound(format!("pvc {}", name))),
        }
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<()> {
        let yaml = KubernetesManifests::generate_pvc_yaml(spec, &self.config.namespace)?;
        let out = self.create_from_yaml(&yaml).await?;
        info!("🗂️ {}", out.trim());
        Ok(())
    }

    async fn delete_volume(&self, name: &str) -> Result<()> {
        self.run(&["delete", "pvc", name, "--wait=false"], true, Some(name))
            .await
            .map(|_| ())
    }

    async fn list_workers(&self) -> Result<Vec<WorkerProcess>> {
        let selector = owner_selector();
        let json = self
            .run(&["get", "pods", "-l", &selector, "-o", "json"], true, None)
            .await?;
        parse_worker_list(&json)
    }

    async fn delete_worker(&self, name: &str) -> Result<()> {
        self.run(&["delete", "pod", name, "--wait=false"], true, Some(name))
            .await
            .map(|_| ())
    }

    async fn set_reclaim_policy(&self, backing_volume: &str, policy: ReclaimPolicy) -> Result<()> {
        let patch = serde_json::json!({
            "spec": { "persistentVolumeReclaimPolicy": policy.as_str() }
        })
        .to_string();

        // PersistentVolumes are cluster scoped
        self.run(
            &["patch", "pv", backing_volume, "--type", "merge", "-p", &patch],
            false,
            None,
        )
        .await
        .map(|_| ())
    }
}

/// Map a failed kubectl invocation onto the error taxonomy. NotFound requires the server's
/// `(NotFound)` reason for the addressed resource itself, e.g.
/// `Error from server (NotFound): jobs.batch "retire-a" not found`.
fn classify_failure(command: &str, target: Option<&str>, stderr: &str) -> AppError {
    let stderr = stderr.trim();
    let missing = target.is_some_and(|name| {
        stderr.contains("(NotFound)") && stderr.contains(&format!("\"{}\" not found", name))
    });
    if missing {
        AppError::NotFound(stderr.to_string())
    } else {
        AppError::KubernetesError(format!("kubectl {} failed: {}", command, stderr))
    }
}

/// `--ignore-not-found` prints nothing for a missing object
fn missing_if_empty(stdout: String) -> Option<String> {
    if stdout.trim().is_empty() {
        None
    } else {
        Some(stdout)
    }
}

#[derive(Debug, Deserialize)]
struct ObjectList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    annotations: Option<HashMap<String, String>>,
    #[serde(default)]
    creation_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    fn partition(&self) -> Option<String> {
        self.annotations
            .as_ref()
            .and_then(|a| a.get(PARTITION_ANNOTATION_KEY))
            .filter(|p| !p.is_empty())
            .cloned()
    }
}

#[derive(Debug, Deserialize)]
struct JobObject {
    metadata: ObjectMeta,
    #[serde(default)]
    status: Option<JobStatusObject>,
}

#[derive(Debug, Default, Deserialize)]
struct JobStatusObject {
    #[serde(default)]
    conditions: Option<Vec<ConditionObject>>,
}

#[derive(Debug, Deserialize)]
struct ConditionObject {
    #[serde(rename = "type")]
    condition_type: String,
    status: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PvcObject {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: Option<PvcSpecObject>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PvcSpecObject {
    #[serde(default)]
    storage_class_name: Option<String>,
    #[serde(default)]
    volume_name: Option<String>,
    #[serde(default)]
    resources: Option<ResourcesObject>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourcesObject {
    #[serde(default)]
    requests: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct PodObject {
    metadata: ObjectMeta,
    #[serde(default)]
    status: Option<PodStatusObject>,
}

#[derive(Debug, Default, Deserialize)]
struct PodStatusObject {
    #[serde(default)]
    phase: Option<String>,
}

impl From<JobObject> for ManagedJob {
    fn from(job: JobObject) -> Self {
        let partition = job.metadata.partition();
        let conditions = job
            .status
            .and_then(|s| s.conditions)
            .unwrap_or_default()
            .into_iter()
            .map(|c| JobCondition {
                condition_type: c.condition_type,
                status: c.status,
                reason: c.reason,
                message: c.message,
            })
            .collect();

        ManagedJob {
            name: job.metadata.name,
            partition,
            conditions,
            created_at: job.metadata.creation_timestamp,
        }
    }
}

impl From<PvcObject> for ManagedVolume {
    fn from(pvc: PvcObject) -> Self {
        let partition = pvc.metadata.partition();
        let spec = pvc.spec.unwrap_or_default();
        let capacity = spec
            .resources
            .and_then(|r| r.requests)
            .and_then(|mut r| r.remove("storage"));

        ManagedVolume {
            name: pvc.metadata.name,
            partition,
            storage_class: spec.storage_class_name,
            capacity,
            bound_volume: spec.volume_name.filter(|v| !v.is_empty()),
        }
    }
}

impl From<PodObject> for WorkerProcess {
    fn from(pod: PodObject) -> Self {
        let phase = pod
            .status
            .and_then(|s| s.phase)
            .map(|p| WorkerPhase::parse(&p))
            .unwrap_or(WorkerPhase::Unknown);

        WorkerProcess {
            name: pod.metadata.name,
            phase,
        }
    }
}

fn parse_job_list(json: &str) -> Result<Vec<ManagedJob>> {
    let list: ObjectList<JobObject> = serde_json::from_str(json).map_err(|e| {
        AppError::KubernetesError(format!("Failed to parse job list JSON: {}", e))
    })?;
    Ok(list.items.into_iter().map(ManagedJob::from).collect())
}

fn parse_job(json: &str) -> Result<ManagedJob> {
    let job: JobObject = serde_json::from_str(json)
        .map_err(|e| AppError::KubernetesError(format!("Failed to parse job JSON: {}", e)))?;
    Ok(job.into())
}

fn parse_volume_list(json: &str) -> Result<Vec<ManagedVolume>> {
    let list: ObjectList<PvcObject> = serde_json::from_str(json).map_err(|e| {
        AppError::KubernetesError(format!("Failed to parse PVC list JSON: {}", e))
    })?;
    Ok(list.items.into_iter().map(ManagedVolume::from).collect())
}

fn parse_volume(json: &str) -> Result<ManagedVolume> {
    let pvc: PvcObject = serde_json::from_str(json)
        .map_err(|e| AppError::KubernetesError(format!("Failed to parse PVC JSON: {}", e)))?;
    Ok(pvc.into())
}

fn parse_worker_list(json: &str) -> Result<Vec<WorkerProcess>> {
    let list: ObjectList<PodObject> = serde_json::from_str(json).map_err(|e| {
        AppError::KubernetesError(format!("Failed to parse pod list JSON: {}", e))
    })?;
    Ok(list.items.into_iter().map(WorkerProcess::from).collect())
}
