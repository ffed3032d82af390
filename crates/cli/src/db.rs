//! Database setup, configuration and status

use anyhow::{Context, Result};
use drillbooks_engine::{EngineConfig, EngineContext, Provisioner};
use drillbooks_persistence::{
    create_source_tables, AccountRepo, Database, JournalRepo, RunLogReader, SchemaCapabilities,
};
use std::path::Path;

/// Engine configuration from `--config` (or defaults) plus overrides
pub fn load_config(path: Option<&Path>, audit_dir: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => EngineConfig::default(),
    };
    let config = config
        .with_env_overrides()
        .context("Invalid environment override")?;

    Ok(match audit_dir {
        Some(dir) => config.with_audit_dir(dir),
        None => config,
    })
}

/// Open the ledger database, applying migrations
pub async fn open(db_path: &Path) -> Result<Database> {
    let db_url = format!("sqlite:{}", db_path.display());
    Database::open(&db_url, None::<&Path>)
        .await
        .with_context(|| format!("Failed to open database at {:?}", db_path))
}

/// Create the ledger schema and provision the chart of accounts
pub async fn init_database(db_path: &Path, config: EngineConfig, with_sources: bool) -> Result<()> {
    let db = open(db_path).await?;

    if with_sources {
        create_source_tables(db.pool())
            .await
            .context("Failed to create source tables")?;
        println!("📦 Source tables created");
    }

    let ctx = EngineContext::new(&db, config);
    let outcome = Provisioner::new(&ctx)
        .ensure_accounts()
        .await
        .context("Failed to provision chart of accounts")?;

    println!("✅ Database initialized at {:?}", db_path);
    println!("   Accounts created:  {}", outcome.created.len());
    println!("   Accounts existing: {}", outcome.existing.len());
    for d in &outcome.discrepancies {
        println!("   ⚠️  {}", d.message);
    }

    db.pool().close().await;
    Ok(())
}

/// Show ledger counts, source capabilities and the latest run
pub async fn show_status(db_path: &Path, config: &EngineConfig) -> Result<()> {
    if !db_path.exists() {
        println!("❌ Database not found at {:?}", db_path);
        println!("   Run 'drillbooks init' to create the database");
        return Ok(());
    }

    let db = open(db_path).await?;
    let pool = db.pool();

    println!("📊 Ledger Status");
    println!("   Path: {:?}", db_path);
    println!();
    println!("   Accounts:        {}", AccountRepo::count(pool).await?);
    println!("   Journal entries: {}", JournalRepo::count(pool).await?);
    for (domain, count) in JournalRepo::count_by_domain(pool).await? {
        println!("     {:<14} {}", domain, count);
    }

    let caps = SchemaCapabilities::probe(pool).await?;
    let mark = |present: bool| if present { "✅" } else { "❌" };
    println!();
    println!("   Source tables");
    println!("     field_reports  {}", mark(caps.field_reports));
    println!(
        "     loans          {} {}",
        mark(caps.loans_table.is_some()),
        caps.loans_table.unwrap_or("")
    );
    println!(
        "     repayments     {} {}",
        mark(caps.repayments_table.is_some()),
        caps.repayments_table.unwrap_or("")
    );
    println!("     materials      {}", mark(caps.materials));
    println!("     payroll        {}", mark(caps.payroll));

    if let Some(dir) = &config.audit_dir {
        if let Some(run) = RunLogReader::new(dir).latest()? {
            println!();
            println!("   Last run: {} ({}) {}", run.started_at.to_rfc3339(), run.kind, run.message);
        }
    }

    db.pool().close().await;
    Ok(())
}
