//! # Drillbooks Persistence
//!
//! Persistence layer for Drillbooks - SQLite ledger + JSONL run log.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Database                              │
//! │  ┌─────────────┐   ┌──────────────┐   ┌───────────────────┐  │
//! │  │   Ledger    │   │   Sources    │   │      RunLog       │  │
//! │  │ (accounts,  │   │ (read only,  │   │  (JSONL per day)  │  │
//! │  │  journal)   │   │  probed)     │   │                   │  │
//! │  └─────────────┘   └──────────────┘   └───────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use drillbooks_persistence::{Database, JournalRepo};
//!
//! let db = Database::open("sqlite:drillbooks.db", Some("data/runs")).await?;
//! let (debits, credits, entries) = JournalRepo::ledger_totals(db.pool()).await?;
//! ```

pub mod audit;
pub mod error;
pub mod sqlite;

pub use audit::{RunFilter, RunKind, RunLog, RunLogReader, RunRecord};
pub use error::{PersistenceError, PersistenceResult};
pub use sqlite::schema::{AccountBalance, AccountRow, EntryTotals, JournalEntryRow, JournalLineRow};
pub use sqlite::sources::{SchemaCapabilities, SourceRepo};
pub use sqlite::{
    create_pool, create_source_tables, init_database, memory_pool, run_migrations, AccountRepo,
    EntryFilter, InsertOutcome, JournalRepo,
};

use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

/// Database facade - ledger pool plus optional run log
pub struct Database {
    pool: SqlitePool,
    run_log: Option<Arc<RunLog>>,
}

impl Database {
    /// Open a file database and apply migrations
    ///
    /// # Arguments
    /// * `db_url` - SQLite database URL (e.g., "sqlite:drillbooks.db")
    /// * `audit_dir` - Directory for the JSONL run log, if any
    pub async fn open<Q: AsRef<Path>>(
        db_url: &str,
        audit_dir: Option<Q>,
    ) -> PersistenceResult<Self> {
        let pool = init_database(db_url).await?;
        Self::from_pool(pool, audit_dir)
    }

    /// In-memory database with migrations applied
    pub async fn in_memory() -> PersistenceResult<Self> {
        let pool = memory_pool().await?;
        run_migrations(&pool).await?;
        Ok(Self {
            pool,
            run_log: None,
        })
    }

    /// Wrap an existing pool
    pub fn from_pool<Q: AsRef<Path>>(
        pool: SqlitePool,
        audit_dir: Option<Q>,
    ) -> PersistenceResult<Self> {
        let run_log = audit_dir.map(RunLog::new).transpose()?.map(Arc::new);
        Ok(Self { pool, run_log })
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get run log
    pub fn run_log(&self) -> Option<&RunLog> {
        self.run_log.as_deref()
    }

    /// Shared handle to the run log, for components that outlive a borrow
    pub fn shared_run_log(&self) -> Option<Arc<RunLog>> {
        self.run_log.clone()
    }

    /// Reader over the run log directory
    pub fn run_log_reader(&self) -> Option<RunLogReader> {
        self.run_log
            .as_ref()
            .map(|log| RunLogReader::new(log.base_path()))
    }
}
