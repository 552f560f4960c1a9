use crate::error::{AppError, Result};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Deferred-class patterns used when none are configured
pub const DEFAULT_DEFERRED_PATTERNS: &[&str] = &[
    "info-prod-",
    "info-production-",
    "access-prod-",
    "access-production-",
    "-prod",
];

/// How kubectl reaches the cluster
#[derive(Debug, Clone, Deserialize)]
pub struct KubectlConfig {
    pub binary: String,
    /// Path to the kubeconfig file; `None` lets kubectl use its own discovery
    pub kubeconfig: Option<String>,
    pub namespace: String,
}

/// Template for the worker container that performs the archival transfer
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerTemplate {
    pub image: String,
    pub batch_size: u32,
    pub cpu_request: String,
    pub cpu_limit: String,
    pub memory_request: String,
    pub memory_limit: String,
    pub data_mount: String,
    pub config_map: String,
    pub config_map_key: String,
    pub config_mount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageTemplate {
    pub storage_class: String,
    pub request: String,
}

/// Bounded poll used while waiting for executor-side effects to settle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Number of probes performed before giving up, always at least one
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let attempts = self.timeout.as_nanos() / self.interval.as_nanos();
        attempts.clamp(1, u32::MAX as u128) as u32
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub dry_run: bool,
    pub es_url: String,
    pub kubectl: KubectlConfig,
    pub max_tasks: usize,
    pub keep_days: i64,
    pub deferred_patterns: Vec<String>,
    pub worker: WorkerTemplate,
    pub storage: StorageTemplate,
    pub notify_url: Option<String>,
    pub binding: PollSettings,
    pub settle: PollSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            es_url: "http://127.0.0.1:9200".to_string(),
            kubectl: KubectlConfig {
                binary: "kubectl".to_string(),
                kubeconfig: Some("kubeconfig".to_string()),
                namespace: "esmaint".to_string(),
            },
            max_tasks: 4,
            keep_days: 95,
            deferred_patterns: DEFAULT_DEFERRED_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            worker: WorkerTemplate {
                image: "guoyk/esbridge".to_string(),
                batch_size: 2000,
                cpu_request: "2".to_string(),
                cpu_limit: "2".to_string(),
                memory_request: "2000Mi".to_string(),
                memory_limit: "6000Mi".to_string(),
                data_mount: "/data".to_string(),
                config_map: "esbridge-cfg".to_string(),
                config_map_key: "esbridge.yml".to_string(),
                config_mount: "/etc/esbridge.yml".to_string(),
            },
            storage: StorageTemplate {
                storage_class: "local-path".to_string(),
                request: "200Gi".to_string(),
            },
            notify_url: None,
            binding: PollSettings::new(Duration::from_secs(2), Duration::from_secs(60)),
            settle: PollSettings::new(Duration::from_secs(2), Duration::from_secs(30)),
        }
    }
}

impl AppConfig {
    /// Build configuration from `RETIRER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let poll_interval = Duration::from_secs(parse_or(
            &get,
            "RETIRER_POLL_INTERVAL_SECS",
            defaults.binding.interval.as_secs(),
        )?);
        let bind_timeout = Duration::from_secs(parse_or(
            &get,
            "RETIRER_BIND_TIMEOUT_SECS",
            defaults.binding.timeout.as_secs(),
        )?);
        let settle_timeout = Duration::from_secs(parse_or(
            &get,
            "RETIRER_SETTLE_TIMEOUT_SECS",
            defaults.settle.timeout.as_secs(),
        )?);

        let deferred_patterns = match get("RETIRER_DEFERRED_PATTERNS") {
            Some(raw) => raw
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            None => defaults.deferred_patterns,
        };

        let config = Self {
            dry_run: parse_bool_or(&get, "RETIRER_DRY_RUN", defaults.dry_run)?,
            es_url: get("RETIRER_ES_URL").unwrap_or(defaults.es_url),
            kubectl: KubectlConfig {
                binary: get("RETIRER_KUBECTL").unwrap_or(defaults.kubectl.binary),
                kubeconfig: get("RETIRER_KUBECONFIG").or(defaults.kubectl.kubeconfig),
                namespace: get("RETIRER_NAMESPACE").unwrap_or(defaults.kubectl.namespace),
            },
            max_tasks: parse_or(&get, "RETIRER_MAX_TASKS", defaults.max_tasks)?,
            keep_days: parse_or(&get, "RETIRER_KEEP_DAYS", defaults.keep_days)?,
            deferred_patterns,
            worker: WorkerTemplate {
                image: get("RETIRER_IMAGE").unwrap_or(defaults.worker.image),
                batch_size: parse_or(&get, "RETIRER_BATCH_SIZE", defaults.worker.batch_size)?,
                cpu_request: get("RETIRER_CPU_REQUEST").unwrap_or(defaults.worker.cpu_request),
                cpu_limit: get("RETIRER_CPU_LIMIT").unwrap_or(defaults.worker.cpu_limit),
                memory_request: get("RETIRER_MEMORY_REQUEST")
                    .unwrap_or(defaults.worker.memory_request),
                memory_limit: get("RETIRER_MEMORY_LIMIT").unwrap_or(defaults.worker.memory_limit),
                data_mount: get("RETIRER_DATA_MOUNT").unwrap_or(defaults.worker.data_mount),
                config_map: get("RETIRER_CONFIG_MAP").unwrap_or(defaults.worker.config_map),
                config_map_key: get("RETIRER_CONFIG_MAP_KEY")
                    .unwrap_or(defaults.worker.config_map_key),
                config_mount: get("RETIRER_CONFIG_MOUNT").unwrap_or(defaults.worker.config_mount),
            },
            storage: StorageTemplate {
                storage_class: get("RETIRER_STORAGE_CLASS")
                    .unwrap_or(defaults.storage.storage_class),
                request: get("RETIRER_STORAGE_REQUEST").unwrap_or(defaults.storage.request),
            },
            notify_url: get("RETIRER_NOTIFY_URL"),
            binding: PollSettings::new(poll_interval, bind_timeout),
            settle: PollSettings::new(poll_interval, settle_timeout),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot work with
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.es_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid RETIRER_ES_URL '{}': {}", self.es_url, e))
        })?;

        if let Some(notify_url) = &self.notify_url {
            url::Url::parse(notify_url).map_err(|e| {
                AppError::ConfigError(format!("Invalid RETIRER_NOTIFY_URL '{}': {}", notify_url, e))
            })?;
        }

        if self.kubectl.namespace.trim().is_empty() {
            return Err(AppError::ConfigError("Namespace cannot be empty".to_string()));
        }
        if self.worker.image.trim().is_empty() {
            return Err(AppError::ConfigError("Worker image cannot be empty".to_string()));
        }
        if self.keep_days < 0 {
            return Err(AppError::ConfigError(format!(
                "RETIRER_KEEP_DAYS must not be negative, got {}",
                self.keep_days
            )));
        }
        if self.binding.interval.is_zero() {
            return Err(AppError::ConfigError(
                "RETIRER_POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("{} must be a number: {}", key, e))),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(AppError::ConfigError(format!(
            "{} must be a boolean, got '{}'",
            key, v
        ))),
        None => Ok(default),
    }
}
