//! Partition catalog seam
//!
//! The data store is only ever asked for the full list of partition names.

pub mod elasticsearch;

pub use elasticsearch::ElasticsearchCatalog;

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PartitionCatalog: Send + Sync {
    /// Every partition currently known to the data store, unfiltered
    async fn list_partitions(&self) -> Result<Vec<String>>;
}
