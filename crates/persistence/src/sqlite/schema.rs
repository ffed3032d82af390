//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables.
//! Ledger schema is defined in migrations/20261014000001_ledger.sql

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, NaiveDate, Utc};
use drillbooks_core::{
    Account, AccountType, Fingerprint, JournalEntry, JournalLine, SourceDomain,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Row type for table `accounts`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub account_type: String,
    pub is_active: bool,
}

/// Row type for table `journal_entries`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct JournalEntryRow {
    pub id: i64,
    pub entry_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub source_domain: String,
    pub source_fingerprint: String,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `journal_entry_lines`, joined with the account code
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct JournalLineRow {
    pub id: i64,
    pub entry_id: i64,
    pub account_id: i64,
    pub account_code: String,
    pub debit: String,  // Decimal stored as TEXT
    pub credit: String, // Decimal stored as TEXT
    pub memo: Option<String>,
}

/// Per-account debit/credit totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_id: i64,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

impl AccountBalance {
    /// Balance on the account's normal side
    pub fn balance(&self) -> Decimal {
        match self.account_type.normal_balance() {
            drillbooks_core::Side::Debit => self.total_debit - self.total_credit,
            drillbooks_core::Side::Credit => self.total_credit - self.total_debit,
        }
    }
}

/// Debit/credit totals of one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    pub entry_id: i64,
    pub fingerprint: String,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

// === Conversion helpers ===

/// Parse a stored decimal; accepts scientific notation produced by REAL casts
pub fn parse_decimal(value: &str) -> PersistenceResult<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| PersistenceError::InvalidDecimal(value.to_string()))
}

impl TryFrom<AccountRow> for Account {
    type Error = PersistenceError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            account_type: AccountType::parse(&row.account_type)?,
            code: row.code,
            name: row.name,
            is_active: row.is_active,
        })
    }
}

impl TryFrom<JournalLineRow> for JournalLine {
    type Error = PersistenceError;

    fn try_from(row: JournalLineRow) -> Result<Self, Self::Error> {
        Ok(JournalLine {
            id: row.id,
            entry_id: row.entry_id,
            account_id: row.account_id,
            debit: parse_decimal(&row.debit)?,
            credit: parse_decimal(&row.credit)?,
            account_code: row.account_code,
            memo: row.memo,
        })
    }
}

impl JournalEntryRow {
    /// Combine the header with its lines
    pub fn into_entry(self, lines: Vec<JournalLineRow>) -> PersistenceResult<JournalEntry> {
        let lines = lines
            .into_iter()
            .map(JournalLine::try_from)
            .collect::<PersistenceResult<Vec<_>>>()?;

        Ok(JournalEntry {
            id: self.id,
            entry_date: self.entry_date,
            source_domain: SourceDomain::parse(&self.source_domain)?,
            fingerprint: Fingerprint::from_str(&self.source_fingerprint)?,
            description: self.description,
            reference: self.reference,
            created_at: self.created_at,
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1000").unwrap(), dec!(1000));
        assert_eq!(parse_decimal("1000.0").unwrap(), dec!(1000));
        assert_eq!(parse_decimal(" 12.50 ").unwrap(), dec!(12.5));
        assert_eq!(parse_decimal("").unwrap(), dec!(0));
        assert_eq!(parse_decimal("1.5e-3").unwrap(), dec!(0.0015));
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn test_account_balance_normal_side() {
        let revenue = AccountBalance {
            account_id: 1,
            code: "4000".into(),
            name: "Contract Revenue".into(),
            account_type: AccountType::Revenue,
            total_debit: dec!(0),
            total_credit: dec!(1000),
        };
        assert_eq!(revenue.balance(), dec!(1000));

        let cash = AccountBalance {
            account_type: AccountType::Asset,
            total_debit: dec!(200),
            total_credit: dec!(500),
            ..revenue
        };
        assert_eq!(cash.balance(), dec!(-300));
    }
}
