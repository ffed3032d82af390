//! Engine context - shared pool, configuration and chart

use crate::config::EngineConfig;
use drillbooks_core::{AccountRole, ChartOfAccounts};
use drillbooks_persistence::{Database, RunLog};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::warn;

/// Context shared by every engine component
#[derive(Clone)]
pub struct EngineContext {
    pool: SqlitePool,
    config: Arc<EngineConfig>,
    chart: Arc<ChartOfAccounts>,
    run_log: Option<Arc<RunLog>>,
}

impl EngineContext {
    /// Create from an open database.
    ///
    /// Shares the database's run log unless `config.audit_dir` names a
    /// different directory.
    pub fn new(db: &Database, config: EngineConfig) -> Self {
        let shared = db.shared_run_log();
        let run_log = match config.audit_dir.as_deref() {
            Some(dir) if shared.as_ref().map_or(true, |log| log.base_path() != dir) => {
                open_run_log(dir)
            }
            _ => shared,
        };
        Self::with_run_log(db.pool().clone(), config, run_log)
    }

    /// Create from a pool directly; opens `config.audit_dir` if set
    pub fn from_parts(pool: SqlitePool, config: EngineConfig) -> Self {
        let run_log = config.audit_dir.as_deref().and_then(open_run_log);
        Self::with_run_log(pool, config, run_log)
    }

    fn with_run_log(pool: SqlitePool, config: EngineConfig, run_log: Option<Arc<RunLog>>) -> Self {
        let chart = ChartOfAccounts::from_codes(&config.accounts);
        Self {
            pool,
            config: Arc::new(config),
            chart: Arc::new(chart),
            run_log,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn chart(&self) -> &ChartOfAccounts {
        &self.chart
    }

    /// Account code configured for a role
    pub fn code(&self, role: AccountRole) -> &str {
        self.config.accounts.code(role)
    }

    pub fn run_log(&self) -> Option<&RunLog> {
        self.run_log.as_deref()
    }
}

fn open_run_log(dir: &std::path::Path) -> Option<Arc<RunLog>> {
    match RunLog::new(dir) {
        Ok(log) => Some(Arc::new(log)),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Run log unavailable");
            None
        }
    }
}
