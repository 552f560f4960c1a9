//! Kubernetes manifest generation
//!
//! Renders the volume claim and batch job for a partition as YAML that is piped into
//! `kubectl create -f -`.

use super::{JobSpec, VolumeSpec, OWNER_LABEL_KEY, OWNER_LABEL_VALUE, PARTITION_ANNOTATION_KEY};
use crate::error::{AppError, Result};
use tracing::debug;

/// Environment variable the worker reads the partition identifier from
pub const WORKER_INDEX_ENV: &str = "ESBRIDGE_INDEX";
/// Environment variable the worker reads its batch size from
pub const WORKER_BATCH_SIZE_ENV: &str = "ESBRIDGE_BATCH_SIZE";

/// File mode 0644 for the mounted configuration file
const CONFIG_FILE_MODE: u32 = 0o644;

pub struct KubernetesManifests;

impl KubernetesManifests {
    /// Generate the PersistentVolumeClaim backing a job's data directory
    pub fn generate_pvc_yaml(spec: &VolumeSpec, namespace: &str) -> Result<String> {
        debug!("🗂️ Generating PVC YAML: {}", spec.name);

        let yaml = format!(
            r#"apiVersion: v1
kind: PersistentVolumeClaim
metadata:
  name: "{name}"
  namespace: "{namespace}"
  labels:
    "{label_key}": "{label_value}"
  annotations:
    "{annotation_key}": "{partition}"
spec:
  accessModes:
    - ReadWriteOnce
  storageClassName: "{storage_class}"
  resources:
    requests:
      storage: "{capacity}"
"#,
            name = Self::escape_yaml_string(&spec.name),
            namespace = Self::escape_yaml_string(namespace),
            label_key = OWNER_LABEL_KEY,
            label_value = OWNER_LABEL_VALUE,
            annotation_key = PARTITION_ANNOTATION_KEY,
            partition = Self::escape_yaml_string(&spec.partition),
            storage_class = Self::escape_yaml_string(&spec.storage_class),
            capacity = Self::escape_yaml_string(&spec.capacity),
        );

        Self::validate_yaml_syntax(&yaml)?;
        debug!("✅ Generated PVC YAML ({} bytes)", yaml.len());
        Ok(yaml)
    }

    /// Generate the batch Job that archives one partition into its claim
    pub fn generate_job_yaml(spec: &JobSpec, namespace: &str) -> Result<String> {
        debug!("🏗️ Generating Job YAML: {}", spec.name);

        if spec.worker.image.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Worker job requires an image".to_string(),
            ));
        }

        let worker = &spec.worker;
        let yaml = format!(
            r#"apiVersion: batch/v1
kind: Job
metadata:
  name: "{name}"
  namespace: "{namespace}"
  labels:
    "{label_key}": "{label_value}"
  annotations:
    "{annotation_key}": "{partition}"
spec:
  template:
    metadata:
      labels:
        k8s-app: "{name}"
        "{label_key}": "{label_value}"
      annotations:
        "{annotation_key}": "{partition}"
    spec:
      restartPolicy: OnFailure
      containers:
        - name: "{name}"
          image: "{image}"
          imagePullPolicy: Always
          env:
            - name: {index_env}
              value: "{partition}"
            - name: {batch_env}
              value: "{batch_size}"
          resources:
            requests:
              cpu: "{cpu_request}"
              memory: "{memory_request}"
            limits:
              cpu: "{cpu_limit}"
              memory: "{memory_limit}"
          volumeMounts:
            - name: vol-data
              mountPath: "{data_mount}"
            - name: vol-cfg
              mountPath: "{config_mount}"
              subPath: "{config_map_key}"
      volumes:
        - name: vol-cfg
          configMap:
            name: "{config_map}"
            defaultMode: {config_mode}
        - name: vol-data
          persistentVolumeClaim:
            claimName: "{name}"
"#,
            name = Self::escape_yaml_string(&spec.name),
            namespace = Self::escape_yaml_string(namespace),
            label_key = OWNER_LABEL_KEY,
            label_value = OWNER_LABEL_VALUE,
            annotation_key = PARTITION_ANNOTATION_KEY,
            partition = Self::escape_yaml_string(&spec.partition),
            image = Self::escape_yaml_string(&worker.image),
            index_env = WORKER_INDEX_ENV,
            batch_env = WORKER_BATCH_SIZE_ENV,
            batch_size = worker.batch_size,
            cpu_request = Self::escape_yaml_string(&worker.cpu_request),
            memory_request = Self::escape_yaml_string(&worker.memory_request),
            cpu_limit = Self::escape_yaml_string(&worker.cpu_limit),
            memory_limit = Self::escape_yaml_string(&worker.memory_limit),
            data_mount = Self::escape_yaml_string(&worker.data_mount),
            config_mount = Self::escape_yaml_string(&worker.config_mount),
            config_map_key = Self::escape_yaml_string(&worker.config_map_key),
            config_map = Self::escape_yaml_string(&worker.config_map),
            config_mode = CONFIG_FILE_MODE,
        );

        Self::validate_yaml_syntax(&yaml)?;
        debug!("✅ Generated Job YAML ({} bytes)", yaml.len());
        Ok(yaml)
    }

    /// Escape string for inclusion in a double-quoted YAML scalar
    fn escape_yaml_string(input: &str) -> String {
        input
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    /// Validate generated YAML syntax
    pub fn validate_yaml_syntax(yaml: &str) -> Result<()> {
        if let Some((line, _)) = yaml.lines().enumerate().find(|(_, l)| l.contains('\t')) {
            return Err(AppError::ValidationError(format!(
                "YAML contains tab character at line {}",
                line + 1
            )));
        }

        serde_yaml::from_str::<serde_yaml::Value>(yaml)
            .map(|_| ())
            .map_err(|e| AppError::ValidationError(format!("Invalid YAML syntax: {}", e)))
    }
}
