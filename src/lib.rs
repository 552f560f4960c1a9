//! index-retirer - retires aging search-index partitions through Kubernetes batch jobs
//!
//! Each run lists the partitions of the data store, keeps the ones older than the retention
//! threshold, orders them so production data goes last, reconciles the jobs it already owns
//! and launches new jobs for as many partitions as the concurrency budget allows.

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod notify;
pub mod partition;
pub mod scheduler;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use scheduler::{RetentionScheduler, RunReport};
