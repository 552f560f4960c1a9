use anyhow::Context;
use dotenv::dotenv;
use index_retirer::catalog::ElasticsearchCatalog;
use index_retirer::executor::KubectlExecutor;
use index_retirer::notify::notifier_from_url;
use index_retirer::{AppConfig, RetentionScheduler};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn run() -> anyhow::Result<()> {
    let config = Arc::new(AppConfig::from_env().context("failed to load configuration")?);
    if config.dry_run {
        info!("🔍 Simulate-only mode: no cluster resource will be changed");
    }

    let catalog = Arc::new(
        ElasticsearchCatalog::new(&config.es_url).context("failed to create catalog client")?,
    );
    let executor = Arc::new(KubectlExecutor::new(config.kubectl.clone()));
    let notifier =
        notifier_from_url(config.notify_url.as_deref()).context("failed to create notifier")?;

    let scheduler = RetentionScheduler::new(Arc::clone(&config), catalog, executor, notifier);
    let report = scheduler.run().await.context("scheduler run failed")?;

    info!(
        "🏁 Run {} finished: {} eligible, {} ongoing, {} complete, {} failed, {} launched, {} deferred",
        report.run_id,
        report.eligible.len(),
        report.ongoing.len(),
        report.completed.len(),
        report.failed.len(),
        report.launched.len(),
        report.deferred.len()
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => info!("👋 exited"),
        Err(e) => {
            error!("❌ exited with error: {:#}", e);
            std::process::exit(1);
        }
    }
}
