//! Reconciliation audit log
//!
//! One JSONL line per completed run, in per-day files.

pub mod reader;
pub mod store;

pub use reader::{RunFilter, RunLogReader};
pub use store::RunLog;

use chrono::{DateTime, Utc};
use drillbooks_core::{BalanceCheck, Discrepancy, RunSummary};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Which engine operation produced the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Reconcile,
    Initialize,
}

/// One logged run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub kind: RunKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub message: String,
    pub summary: RunSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_check: Option<BalanceCheck>,
    #[serde(default)]
    pub discrepancies: Vec<Discrepancy>,
}
