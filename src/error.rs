#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Kubernetes error: {0}")]
    KubernetesError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to locate bound volume for claim: {0}")]
    VolumeBindingTimeout(String),

    #[error("Notification error: {0}")]
    NotificationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Whether the executor reported that the addressed resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::ValidationError(format!("YAML error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::CatalogError(format!("HTTP error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
