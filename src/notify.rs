//! Best-effort job notifications
//!
//! Notifications are advisory: they are sent in the background, and any failure is logged
//! and dropped.

use crate::error::{AppError, Result};
use crate::executor::JobOutcome;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<()>;
}

/// Posts `{"text": ...}` to a webhook
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::NotificationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| {
                AppError::NotificationError(format!("Failed to post notification: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::NotificationError(format!(
                "Notification sink returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Used when no notification sink is configured
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        debug!("🔕 Notification disabled, dropping: {}", text);
        Ok(())
    }
}

/// Pick the notifier for an optional sink URL
pub fn notifier_from_url(url: Option<&str>) -> Result<Arc<dyn Notifier>> {
    match url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(url)?)),
        None => Ok(Arc::new(NoopNotifier)),
    }
}

/// Human-readable text for a terminal job
pub fn outcome_message(outcome: JobOutcome, job_name: &str) -> String {
    match outcome {
        JobOutcome::Failed => format!("Task failed: {}", job_name),
        _ => format!("Task complete: {}", job_name),
    }
}

/// Fire-and-forget delivery with a join point before the process exits
pub struct NotificationDispatch {
    notifier: Arc<dyn Notifier>,
    in_flight: JoinSet<()>,
}

impl NotificationDispatch {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            in_flight: JoinSet::new(),
        }
    }

    pub fn send(&mut self, text: String) {
        let notifier = Arc::clone(&self.notifier);
        self.in_flight.spawn(async move {
            if let Err(e) = notifier.notify(&text).await {
                warn!("⚠️ Notification dropped ({}): {}", text, e);
            }
        });
    }

    /// Wait for every notification sent so far
    pub async fn flush(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                warn!("⚠️ Notification task aborted: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_message() {
        assert_eq!(
            outcome_message(JobOutcome::Complete, "retire-a"),
            "Task complete: retire-a"
        );
        assert_eq!(
            outcome_message(JobOutcome::Failed, "retire-a"),
            "Task failed: retire-a"
        );
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _text: &str) -> Result<()> {
            Err(AppError::NotificationError("sink down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let mut dispatch = NotificationDispatch::new(Arc::new(FailingNotifier));
        dispatch.send("Task failed: retire-a".to_string());
        dispatch.flush().await;
    }

    #[test]
    fn test_notifier_from_url() {
        assert!(notifier_from_url(None).is_ok());
        assert!(notifier_from_url(Some("http://127.0.0.1:9/hook")).is_ok());
    }
}
