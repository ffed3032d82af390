//! Drillbooks CLI - Reconciliation passes and ledger views from the command line
//!
//! Usage:
//! ```bash
//! drillbooks init --with-sources
//! drillbooks initialize
//! drillbooks reconcile --since 2026-01-01
//! drillbooks trial-balance --format csv --output tb.csv
//! drillbooks journal --domain loans --limit 20
//! drillbooks history --needs-review
//! ```
//!
//! `reconcile` and `initialize` print the JSON envelope on stdout; logs go
//! to stderr.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use drillbooks_core::SourceDomain;
use drillbooks_reports::{CsvExporter, JsonExporter, MarkdownExporter, ReportExporter};
use std::path::PathBuf;

mod commands;
mod db;

use commands::{history, ledger, run};

/// Drillbooks - double-entry auto-tracking and reconciliation for field operations
#[derive(Parser)]
#[command(name = "drillbooks")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, default_value = "data/drillbooks.db", global = true)]
    pub db: PathBuf,

    /// Run log directory (JSONL, one file per day)
    #[arg(long, global = true)]
    pub audit_dir: Option<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the ledger schema and the chart of accounts
    Init {
        /// Also create empty source tables (field reports, loans, materials, payroll)
        #[arg(long)]
        with_sources: bool,
    },

    /// Run a reconciliation pass
    Reconcile {
        /// Only scan records dated on or after this day (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
    },

    /// Bulk-post every existing source record
    Initialize,

    /// Check that total debits equal total credits
    Balance,

    /// Account balances
    TrialBalance {
        #[arg(long, default_value = "markdown")]
        format: ReportFormat,
        /// Output file path
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Posted journal entries, newest first
    Journal {
        /// Only entries from this domain
        #[arg(long)]
        domain: Option<DomainArg>,
        /// Only entries dated on or after this day (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value = "markdown")]
        format: ReportFormat,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Logged runs from the run log
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only runs that left items for review
        #[arg(long)]
        needs_review: bool,
        #[arg(long, default_value = "markdown")]
        format: ReportFormat,
    },

    /// Show ledger counts and which source tables exist
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn exporter(&self) -> Box<dyn ReportExporter> {
        match self {
            ReportFormat::Csv => Box::new(CsvExporter::new()),
            ReportFormat::Json => Box::new(JsonExporter::new()),
            ReportFormat::Markdown => Box::new(MarkdownExporter::new()),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DomainArg {
    FieldReports,
    Loans,
    Materials,
    Payroll,
}

impl DomainArg {
    pub fn to_core_domain(&self) -> SourceDomain {
        match self {
            DomainArg::FieldReports => SourceDomain::FieldReports,
            DomainArg::Loans => SourceDomain::Loans,
            DomainArg::Materials => SourceDomain::Materials,
            DomainArg::Payroll => SourceDomain::Payroll,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs on stderr; stdout carries the JSON envelopes
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    if let Some(parent) = cli.db.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let config = db::load_config(cli.config.as_deref(), cli.audit_dir.as_deref())?;

    match cli.command {
        Commands::Init { with_sources } => {
            db::init_database(&cli.db, config, with_sources).await?;
        }

        Commands::Reconcile { since } => {
            run::reconcile(&cli.db, config, since).await?;
        }

        Commands::Initialize => {
            run::initialize(&cli.db, config).await?;
        }

        Commands::Balance => {
            ledger::balance(&cli.db, config).await?;
        }

        Commands::TrialBalance { format, output } => {
            ledger::trial_balance(&cli.db, config, format, output).await?;
        }

        Commands::Journal {
            domain,
            since,
            limit,
            format,
            output,
        } => {
            ledger::journal(&cli.db, domain, since, limit, format, output).await?;
        }

        Commands::History {
            limit,
            needs_review,
            format,
        } => {
            history::show(&config, limit, needs_review, format)?;
        }

        Commands::Status => {
            db::show_status(&cli.db, &config).await?;
        }
    }

    Ok(())
}
