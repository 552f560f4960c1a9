use super::PartitionCatalog;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct CatIndexRow {
    index: String,
}

/// Lists indices through the `_cat/indices` API
pub struct ElasticsearchCatalog {
    client: Client,
    base_url: String,
}

impl ElasticsearchCatalog {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::CatalogError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PartitionCatalog for ElasticsearchCatalog {
    async fn list_partitions(&self) -> Result<Vec<String>> {
        let url = format!("{}/_cat/indices?format=json&h=index", self.base_url);
        debug!("🔍 Listing indices: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::CatalogError(format!(
                "Failed to list indices ({}): {}",
                status, error_text
            )));
        }

        let rows: Vec<CatIndexRow> = response.json().await.map_err(|e| {
            AppError::CatalogError(format!("Failed to parse _cat/indices response: {}", e))
        })?;

        info!("📚 Catalog returned {} indices", rows.len());
        Ok(rows.into_iter().map(|row| row.index).collect())
    }
}
