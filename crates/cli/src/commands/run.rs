//! Reconcile and initialize commands

use anyhow::{bail, Result};
use chrono::NaiveDate;
use drillbooks_engine::{EngineConfig, EngineContext, Orchestrator};
use drillbooks_reports::{initialization_envelope, reconciliation_envelope};
use std::path::Path;
use tracing::info;

use crate::db;

/// Run a reconciliation pass and print its envelope
pub async fn reconcile(db_path: &Path, config: EngineConfig, since: Option<NaiveDate>) -> Result<()> {
    let db = db::open(db_path).await?;
    let engine = Orchestrator::new(EngineContext::new(&db, config));

    info!(db = %db_path.display(), since = ?since, "Starting reconciliation");
    let report = engine.reconcile(since).await;
    println!("{}", serde_json::to_string_pretty(&reconciliation_envelope(&report))?);

    if let Some(log) = engine.context().run_log() {
        log.flush()?;
    }
    db.pool().close().await;

    if !report.success {
        bail!("{}", report.message);
    }
    Ok(())
}

/// Bulk-post existing source records and print the envelope
pub async fn initialize(db_path: &Path, config: EngineConfig) -> Result<()> {
    let db = db::open(db_path).await?;
    let engine = Orchestrator::new(EngineContext::new(&db, config));

    info!(db = %db_path.display(), "Starting initialization");
    let report = engine.initialize().await;
    println!("{}", serde_json::to_string_pretty(&initialization_envelope(&report))?);

    if let Some(log) = engine.context().run_log() {
        log.flush()?;
    }
    db.pool().close().await;

    if !report.success {
        bail!("{}", report.message);
    }
    Ok(())
}
