use std::env;
use std::sync::Arc;

use database::Database;
use scheduler::{Executor, JobRegistry, LoggingTransport, Scheduler, SchedulerConfig, SystemClock};
use selection::{sync_categories, SelectionConfig, SelectionEngine};
use tracing::{info, warn};
use upstream::{AladhanClient, AladhanConfig, HadeethClient, HadeethConfig};

fn get_database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:minaret.db?mode=rwc".to_string())
}

fn get_content_config() -> HadeethConfig {
    let mut config = HadeethConfig::default();
    if let Ok(language) = env::var("MINARET_LANGUAGE") {
        config.language = language;
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let db = Database::connect(&get_database_url()).await?;
    db.migrate().await?;

    let content_source = Arc::new(HadeethClient::new(get_content_config()));
    let prayer_source = Arc::new(AladhanClient::new(AladhanConfig::default()));

    // A failed sync is not fatal; the stored catalog keeps serving
    match sync_categories(db.pool(), content_source.as_ref()).await {
        Ok(count) => info!("Category catalog synced ({} categories)", count),
        Err(e) => warn!("Category sync failed, keeping stored catalog: {}", e),
    }

    let registry = Arc::new(JobRegistry::new());
    let clock = Arc::new(SystemClock);
    let config = SchedulerConfig::default();

    let selection = SelectionEngine::new(
        db.pool().clone(),
        content_source,
        SelectionConfig::default(),
    );
    let executor = Arc::new(Executor::new(
        db.pool().clone(),
        selection,
        Arc::new(LoggingTransport),
        registry.clone(),
        clock.clone(),
        config.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(
        db.pool().clone(),
        prayer_source,
        executor,
        registry.clone(),
        clock,
        config,
    ));

    let summary = scheduler.rebuild().await?;
    info!(
        "Initial rebuild armed {} timers across {} groups ({} failed)",
        summary.timers_armed, summary.groups_armed, summary.groups_failed
    );

    let daily = scheduler.clone();
    tokio::spawn(async move {
        daily.run_daily().await;
    });

    tokio::signal::ctrl_c().await?;
    let cancelled = registry.cancel_all().await;
    info!("Shutting down, cancelled {} pending timers", cancelled);
    db.close().await;

    Ok(())
}
