//! Pass reports

use chrono::{DateTime, Utc};
use drillbooks_core::{BalanceCheck, Discrepancy, RunSummary, SourceDomain};
use drillbooks_persistence::{RunKind, RunRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Per-domain counts of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainStats {
    pub scanned: u64,
    pub processed: u64,
    pub skipped: u64,
    pub rejected: u64,
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub summary: RunSummary,
    /// `None` when the check itself could not run
    pub balance_check: Option<BalanceCheck>,
    /// Every classified discrepancy that was not auto-fixed
    pub discrepancies: Vec<Discrepancy>,
    pub needs_review: Vec<Discrepancy>,
    pub auto_fixed: Vec<Discrepancy>,
    pub domains: BTreeMap<SourceDomain, DomainStats>,
}

impl ReconciliationReport {
    pub(crate) fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            success: false,
            message: String::new(),
            error: None,
            summary: RunSummary::default(),
            balance_check: None,
            discrepancies: Vec::new(),
            needs_review: Vec::new(),
            auto_fixed: Vec::new(),
            domains: BTreeMap::new(),
        }
    }

    /// Report of a pass that stopped at setup
    pub(crate) fn failed(run_id: Uuid, started_at: DateTime<Utc>, error: String) -> Self {
        let mut report = Self::new(run_id, started_at);
        report.message = format!("Reconciliation failed: {}", error);
        report.error = Some(error);
        report.finished_at = Utc::now();
        report
    }

    pub fn has_critical(&self) -> bool {
        self.discrepancies.iter().any(Discrepancy::is_critical)
    }

    pub fn to_run_record(&self) -> RunRecord {
        RunRecord {
            run_id: self.run_id.to_string(),
            kind: RunKind::Reconcile,
            started_at: self.started_at,
            finished_at: self.finished_at,
            success: self.success,
            message: self.message.clone(),
            summary: self.summary.clone(),
            balance_check: self.balance_check.clone(),
            discrepancies: self
                .discrepancies
                .iter()
                .chain(self.auto_fixed.iter())
                .cloned()
                .collect(),
        }
    }
}

/// Per-domain result of a bulk initialization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInit {
    pub processed: u64,
    pub skipped: u64,
    pub errors: Vec<String>,
}

/// Result of a bulk initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub domains: BTreeMap<SourceDomain, DomainInit>,
}

impl InitializationReport {
    pub(crate) fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            success: false,
            message: String::new(),
            error: None,
            domains: BTreeMap::new(),
        }
    }

    pub(crate) fn failed(run_id: Uuid, started_at: DateTime<Utc>, error: String) -> Self {
        let mut report = Self::new(run_id, started_at);
        report.message = format!("Initialization failed: {}", error);
        report.error = Some(error);
        report.finished_at = Utc::now();
        report
    }

    pub fn total_processed(&self) -> u64 {
        self.domains.values().map(|d| d.processed).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.domains.values().map(|d| d.skipped).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.domains.values().map(|d| d.errors.len()).sum()
    }

    pub fn to_run_record(&self) -> RunRecord {
        RunRecord {
            run_id: self.run_id.to_string(),
            kind: RunKind::Initialize,
            started_at: self.started_at,
            finished_at: self.finished_at,
            success: self.success,
            message: self.message.clone(),
            summary: RunSummary {
                total_processed: self.total_processed(),
                total_skipped: self.total_skipped(),
                ..Default::default()
            },
            balance_check: None,
            discrepancies: Vec::new(),
        }
    }
}
