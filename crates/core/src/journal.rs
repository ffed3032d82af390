//! Posted journal entries
//!
//! Entries and lines are immutable once written; corrections are new
//! offsetting entries.

use crate::fingerprint::{Fingerprint, SourceDomain};
use crate::money::Tolerance;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A posted journal line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub id: i64,
    pub entry_id: i64,
    pub account_id: i64,
    pub account_code: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub memo: Option<String>,
}

/// A posted journal entry with its lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: i64,
    pub entry_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub source_domain: SourceDomain,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    pub fn total_debits(&self) -> Decimal {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credits(&self) -> Decimal {
        self.lines.iter().map(|l| l.credit).sum()
    }

    pub fn is_balanced(&self, tolerance: Tolerance) -> bool {
        tolerance.approx_eq(self.total_debits(), self.total_credits())
    }

    /// Net amount (debit - credit) per account code, cancelled codes dropped
    pub fn net_by_account(&self) -> BTreeMap<String, Decimal> {
        let mut net: BTreeMap<String, Decimal> = BTreeMap::new();
        for line in &self.lines {
            *net.entry(line.account_code.clone()).or_default() += line.debit - line.credit;
        }
        net.retain(|_, v| !v.is_zero());
        net
    }
}
