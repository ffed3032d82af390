//! Reconciliation run summary types

use crate::money::Tolerance;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Global ledger balance snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheck {
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    /// `|total_debits - total_credits|`
    pub difference: Decimal,
    pub is_balanced: bool,
    pub total_entries: i64,
}

impl BalanceCheck {
    pub fn new(
        total_debits: Decimal,
        total_credits: Decimal,
        total_entries: i64,
        tolerance: Tolerance,
    ) -> Self {
        let difference = (total_debits - total_credits).abs();
        Self {
            total_debits,
            total_credits,
            difference,
            is_balanced: tolerance.is_zero(difference),
            total_entries,
        }
    }

    /// Snapshot of an empty ledger
    pub fn empty() -> Self {
        Self {
            total_debits: Decimal::ZERO,
            total_credits: Decimal::ZERO,
            difference: Decimal::ZERO,
            is_balanced: true,
            total_entries: 0,
        }
    }
}

/// Aggregate counts of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_scanned: u64,
    pub total_processed: u64,
    pub total_skipped: u64,
    pub total_auto_fixed: u64,
    pub total_discrepancies: u64,
    pub total_needs_review: u64,
    pub is_balanced: bool,
}
