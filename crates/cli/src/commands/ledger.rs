//! Read-only ledger views

use anyhow::Result;
use chrono::NaiveDate;
use drillbooks_engine::{BalanceVerifier, EngineConfig, EngineContext};
use drillbooks_persistence::{EntryFilter, JournalRepo};
use drillbooks_reports::{JournalListing, TrialBalanceReport};
use std::path::{Path, PathBuf};

use super::emit;
use crate::{db, DomainArg, ReportFormat};

/// Print the global balance check as JSON
pub async fn balance(db_path: &Path, config: EngineConfig) -> Result<()> {
    let db = db::open(db_path).await?;
    let ctx = EngineContext::new(&db, config);

    let verification = BalanceVerifier::new(&ctx).verify().await?;
    println!("{}", serde_json::to_string_pretty(&verification.balance)?);
    for d in &verification.discrepancies {
        eprintln!("⚠️  [{}] {}", d.severity, d.message);
    }

    db.pool().close().await;
    Ok(())
}

pub async fn trial_balance(
    db_path: &Path,
    config: EngineConfig,
    format: ReportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let db = db::open(db_path).await?;
    let balances = JournalRepo::account_balances(db.pool()).await?;

    let report = TrialBalanceReport::new(balances, config.tolerance);
    emit(&format.exporter().export(&report), output.as_deref())?;

    db.pool().close().await;
    Ok(())
}

pub async fn journal(
    db_path: &Path,
    domain: Option<DomainArg>,
    since: Option<NaiveDate>,
    limit: i64,
    format: ReportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let db = db::open(db_path).await?;

    let mut filter = EntryFilter::new().limit(limit);
    if let Some(domain) = domain {
        filter = filter.domain(domain.to_core_domain());
    }
    if let Some(since) = since {
        filter = filter.since(since);
    }
    let entries = JournalRepo::list_entries(db.pool(), &filter).await?;

    let report = JournalListing::new("Journal", entries);
    emit(&format.exporter().export(&report), output.as_deref())?;

    db.pool().close().await;
    Ok(())
}
