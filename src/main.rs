//! Backfill worker binary.
//!
//! Runs the periodic sweep that materializes elapsed untouched slots as
//! missed records. Everything else in this crate is invoked in-process
//! by the controllers of the embedding application; the sweep is the one
//! component that needs its own schedule.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use classhub::adapters::events::TracingEventPublisher;
use classhub::adapters::postgres::{PostgresGroupCatalog, PostgresSessionsStore};
use classhub::application::BackfillJob;
use classhub::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let store = Arc::new(PostgresSessionsStore::new(pool.clone()));
    let catalog = Arc::new(PostgresGroupCatalog::new(pool));
    let publisher = Arc::new(TracingEventPublisher::new());

    let job = BackfillJob::with_config(
        store,
        catalog,
        publisher,
        config.backfill.to_job_config(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    tracing::info!(
        interval_secs = config.backfill.poll_interval_secs,
        lookback_hours = config.backfill.lookback_hours,
        grace_minutes = config.backfill.grace_minutes,
        "backfill worker started"
    );
    job.run(shutdown_rx).await;

    Ok(())
}
