//! RetireZest background worker
//!
//! Runs the account purge sweep on a cron schedule.

mod config;
mod purge;

use std::sync::Arc;

use anyhow::Context;
use retirezest_entitlement::{LifecycleEngine, PgAccountStore};
use time::OffsetDateTime;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::WorkerConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("retirezest_worker=info,retirezest_entitlement=info")
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::from_env().context("Failed to load configuration")?;

    let pool =
        retirezest_shared::create_pool(&config.database_url, config.database_max_connections)
            .await
            .context("Failed to connect to database")?;
    let engine = LifecycleEngine::new(Arc::new(PgAccountStore::new(pool)), config.engine.clone());

    // Catch up on anything that expired while the worker was down
    if let Ok(purged) = purge::run_purge(&engine, OffsetDateTime::now_utc()).await {
        tracing::info!(purged, "Startup purge sweep finished");
    }

    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create scheduler")?;

    let job_engine = engine.clone();
    let job = Job::new_async(config.purge_schedule.as_str(), move |_id, _scheduler| {
        let engine = job_engine.clone();
        Box::pin(async move {
            if purge::run_purge(&engine, OffsetDateTime::now_utc()).await.is_err() {
                tracing::warn!("Scheduled purge sweep failed, retrying on next tick");
            }
        })
    })
    .with_context(|| format!("Invalid PURGE_SCHEDULE: {}", config.purge_schedule))?;

    scheduler.add(job).await.context("Failed to schedule purge job")?;
    scheduler.start().await.context("Failed to start scheduler")?;

    tracing::info!(schedule = %config.purge_schedule, "RetireZest worker started");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    Ok(())
}
