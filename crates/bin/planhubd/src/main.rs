//! # planhubd — planhub daemon
//!
//! Composition root that wires all adapters together and runs the engine.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository implementations (adapters)
//! - Release execution claims abandoned by a previous run
//! - Construct application services, injecting repositories via port traits
//! - Feed the change processor from the in-process change feed
//! - Sweep expired execution records on a schedule
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod demo;

use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use planhub_adapter_memory::{MemoryNotifier, MemoryTreeStore};
use planhub_adapter_storage_sqlite_sqlx::{
    Config as DbConfig, SqliteAutomationRepository, SqliteExecutionLog,
};
use planhub_app::dispatcher::ActionDispatcher;
use planhub_app::event_bus::InProcessEventBus;
use planhub_app::ports::ExecutionLog;
use planhub_app::processor::ChangeProcessor;
use planhub_app::rollup::RollupPropagator;
use planhub_app::rule_engine::RuleEngine;
use planhub_app::services::audit_service::AuditService;
use planhub_app::services::automation_service::AutomationService;
use planhub_domain::time::now;

use crate::config::Config;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = DbConfig {
        database_url: config.database.url.clone(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Change feed
    let bus = Arc::new(InProcessEventBus::new(config.engine.channel_capacity));
    let events = bus.subscribe();

    // Adapters
    let automations = Arc::new(SqliteAutomationRepository::new(pool.clone()));
    let log = Arc::new(SqliteExecutionLog::new(pool));
    let tree = Arc::new(MemoryTreeStore::new(Arc::clone(&bus)));
    let notifier = Arc::new(MemoryNotifier::new());

    // Claims left by an unclean shutdown are indeterminate; release them
    // before processing begins.
    let recovered = log.recover_abandoned(now()).await?;
    if recovered > 0 {
        tracing::info!(recovered, "released abandoned execution claims");
    }

    // Engine
    let rollup = RollupPropagator::new(Arc::clone(&tree));
    let dispatcher = ActionDispatcher::new(Arc::clone(&tree), notifier, Arc::clone(&log));
    let engine = RuleEngine::new(Arc::clone(&automations), dispatcher);
    let processor = ChangeProcessor::new(rollup, engine);

    // Services
    let automation_service = AutomationService::new(Arc::clone(&automations));
    let audit_service = AuditService::new(Arc::clone(&log));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { processor.run(events, shutdown).await }
    });

    let sweeper = tokio::spawn({
        let mut shutdown = shutdown_rx;
        let retention = config.retention();
        async move {
            // The interval's first tick completes immediately; startup
            // prunes once.
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = audit_service.prune_expired(retention).await {
                            tracing::warn!(error = %err, "retention sweep failed");
                        }
                    }
                }
            }
        }
    });

    if config.demo.enabled {
        demo::seed(&automation_service, &tree).await?;
    }

    tracing::info!(
        database = config.database_url(),
        demo = config.demo.enabled,
        "planhubd running"
    );

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        _ = sigint.recv() => tracing::info!("received SIGINT"),
    }

    // send fails only when both workers are already gone.
    let _ = shutdown_tx.send(true);
    worker.await?;
    sweeper.await?;

    Ok(())
}
