//! Balance verifier
//!
//! Read-only checks over the whole ledger: global Σdebit = Σcredit and
//! per-entry balance.

use crate::context::EngineContext;
use crate::error::EngineResult;
use drillbooks_core::{BalanceCheck, Discrepancy, DiscrepancyKind, Fingerprint};
use drillbooks_persistence::JournalRepo;
use std::str::FromStr;
use tracing::{info, warn};

/// Verifier output
#[derive(Debug, Clone)]
pub struct Verification {
    pub balance: BalanceCheck,
    pub discrepancies: Vec<Discrepancy>,
}

pub struct BalanceVerifier<'a> {
    ctx: &'a EngineContext,
}

impl<'a> BalanceVerifier<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// Global totals over every line
    pub async fn check_balance(&self) -> EngineResult<BalanceCheck> {
        let (debits, credits, entries) = JournalRepo::ledger_totals(self.ctx.pool()).await?;
        Ok(BalanceCheck::new(debits, credits, entries, self.ctx.config().tolerance))
    }

    /// One discrepancy per entry whose lines do not balance
    pub async fn unbalanced_entries(&self) -> EngineResult<Vec<Discrepancy>> {
        let policy = &self.ctx.config().policy;
        let rows = JournalRepo::unbalanced_entries(self.ctx.pool(), self.ctx.config().tolerance).await?;

        Ok(rows
            .into_iter()
            .map(|t| {
                let d = policy.classify(
                    DiscrepancyKind::UnbalancedEntry,
                    format!(
                        "Entry {} is unbalanced: Debits {}, Credits {}",
                        t.entry_id, t.total_debit, t.total_credit
                    ),
                );
                match Fingerprint::from_str(&t.fingerprint) {
                    Ok(fp) => d.with_fingerprint(&fp),
                    Err(_) => d.with_reference(t.fingerprint),
                }
            })
            .collect())
    }

    /// Both checks
    pub async fn verify(&self) -> EngineResult<Verification> {
        let balance = self.check_balance().await?;
        let mut discrepancies = Vec::new();

        if balance.is_balanced {
            info!(
                debits = %balance.total_debits,
                entries = balance.total_entries,
                "Books balanced"
            );
        } else {
            warn!(difference = %balance.difference, "Books are unbalanced");
            discrepancies.push(self.ctx.config().policy.classify(
                DiscrepancyKind::BooksUnbalanced,
                format!(
                    "Books are unbalanced! Total Debits: {}, Total Credits: {}, Difference: {}",
                    balance.total_debits, balance.total_credits, balance.difference
                ),
            ));
        }

        discrepancies.extend(self.unbalanced_entries().await?);
        Ok(Verification {
            balance,
            discrepancies,
        })
    }
}
