//! Posting intents
//!
//! A posting intent is an unwritten, self-balancing journal entry derived
//! from one source record. Adapters build intents; the poster validates and
//! writes them.

use crate::error::{CoreError, CoreResult};
use crate::fingerprint::Fingerprint;
use crate::money::{round2, Tolerance};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

/// Side of a journal line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Debit,
    Credit,
}

/// One proposed line of an intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingLine {
    pub account_code: String,
    pub debit: Decimal,
    pub credit: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl PostingLine {
    pub fn debit(account_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit: amount,
            credit: Decimal::ZERO,
            memo: None,
        }
    }

    pub fn credit(account_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit: Decimal::ZERO,
            credit: amount,
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Debit minus credit
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }

    pub fn side(&self) -> Option<Side> {
        match (self.debit.is_zero(), self.credit.is_zero()) {
            (false, true) => Some(Side::Debit),
            (true, false) => Some(Side::Credit),
            _ => None,
        }
    }
}

/// A proposed journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingIntent {
    pub fingerprint: Fingerprint,
    pub entry_date: NaiveDate,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub lines: Vec<PostingLine>,
}

impl PostingIntent {
    /// Start building an intent
    pub fn builder(
        fingerprint: Fingerprint,
        entry_date: NaiveDate,
        description: impl Into<String>,
    ) -> IntentBuilder {
        IntentBuilder {
            intent: PostingIntent {
                fingerprint,
                entry_date,
                description: description.into(),
                reference: None,
                lines: Vec::new(),
            },
        }
    }

    pub fn total_debits(&self) -> Decimal {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credits(&self) -> Decimal {
        self.lines.iter().map(|l| l.credit).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Net amount (debit - credit) per account code.
    ///
    /// Codes whose lines cancel out are dropped so that two intents
    /// with the same effect compare equal.
    pub fn net_by_account(&self) -> BTreeMap<String, Decimal> {
        let mut net: BTreeMap<String, Decimal> = BTreeMap::new();
        for line in &self.lines {
            *net.entry(line.account_code.clone()).or_default() += line.net();
        }
        net.retain(|_, v| !v.is_zero());
        net
    }

    /// Check the structural rules an intent must satisfy before posting.
    pub fn validate(&self, tolerance: Tolerance) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyIntent);
        }

        for (index, line) in self.lines.iter().enumerate() {
            if line.account_code.trim().is_empty() {
                return Err(CoreError::EmptyAccountCode);
            }
            if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
                return Err(CoreError::NegativeAmount { index });
            }
            if line.side().is_none() {
                return Err(CoreError::InvalidLineSides { index });
            }
        }

        let debits = self.total_debits();
        let credits = self.total_credits();
        if !tolerance.approx_eq(debits, credits) {
            return Err(CoreError::Unbalanced { debits, credits });
        }

        Ok(())
    }
}

/// Builder for [`PostingIntent`].
///
/// Amounts are rounded to ledger precision; zero amounts add no line.
#[derive(Debug, Clone)]
pub struct IntentBuilder {
    intent: PostingIntent,
}

impl IntentBuilder {
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.intent.reference = Some(reference.into());
        self
    }

    pub fn debit(self, account_code: &str, amount: Decimal, memo: &str) -> Self {
        self.line(PostingLine::debit(account_code, round2(amount)).with_memo(memo))
    }

    pub fn credit(self, account_code: &str, amount: Decimal, memo: &str) -> Self {
        self.line(PostingLine::credit(account_code, round2(amount)).with_memo(memo))
    }

    /// Debit one account and credit another with the same amount
    pub fn transfer(self, debit_code: &str, credit_code: &str, amount: Decimal, memo: &str) -> Self {
        self.debit(debit_code, amount, memo)
            .credit(credit_code, amount, memo)
    }

    fn line(mut self, mut line: PostingLine) -> Self {
        if line.memo.as_deref() == Some("") {
            line.memo = None;
        }
        if !line.debit.is_zero() || !line.credit.is_zero() {
            self.intent.lines.push(line);
        }
        self
    }

    pub fn build(self) -> PostingIntent {
        self.intent
    }
}
