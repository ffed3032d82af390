//! Payroll adapter
//!
//! One intent per payroll run, aggregating its entries:
//!
//! ```text
//! Dr wages            Σ(amount + benefits)
//!     Cr cash             Σ(amount - loan_reclaim)
//!     Cr benefits payable Σbenefits
//!     Cr worker loans     Σloan_reclaim
//! ```

use super::{money, overflow, record_date, ScanItem, ScanOutput, SourceAdapter};
use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use drillbooks_core::{AccountRole, Fingerprint, PostingIntent, SourceDomain};
use drillbooks_persistence::sqlite::{PayrollEntryRow, PayrollRunRow};
use drillbooks_persistence::{SchemaCapabilities, SourceRepo};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

pub struct PayrollAdapter;

#[derive(Debug, Default)]
struct RunTotals {
    gross: Decimal,
    net_cash: Decimal,
    benefits: Decimal,
    reclaim: Decimal,
}

impl RunTotals {
    /// Gross is always the sum of the credit sides, so the intent balances exactly
    fn add(&mut self, net_cash: Decimal, benefits: Decimal, reclaim: Decimal) -> Result<(), String> {
        self.net_cash = self.net_cash.checked_add(net_cash).ok_or_else(|| overflow("net wages"))?;
        self.benefits = self.benefits.checked_add(benefits).ok_or_else(|| overflow("benefits"))?;
        self.reclaim = self.reclaim.checked_add(reclaim).ok_or_else(|| overflow("loan reclaim"))?;
        self.gross = self
            .net_cash
            .checked_add(self.benefits)
            .and_then(|sum| sum.checked_add(self.reclaim))
            .ok_or_else(|| overflow("gross payroll"))?;
        Ok(())
    }
}

impl PayrollAdapter {
    pub fn intent_for(
        ctx: &EngineContext,
        run: &PayrollRunRow,
        entries: &[&PayrollEntryRow],
    ) -> Result<Option<PostingIntent>, String> {
        let date = record_date("run_date", run.run_date.as_deref())?;

        let mut totals = RunTotals::default();
        for entry in entries {
            let pay = money("amount", &entry.amount)?;
            let benefits = money("benefits", &entry.benefits)?;
            let reclaim = money("loan_reclaim", &entry.loan_reclaim)?;
            if reclaim > pay {
                return Err(format!(
                    "entry {}: loan reclaim {} exceeds amount {}",
                    entry.id, reclaim, pay
                ));
            }
            totals.add(pay - reclaim, benefits, reclaim)?;
        }

        let period = run
            .period_label
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| date.to_string());
        let intent = PostingIntent::builder(
            Fingerprint::payroll_run(run.id),
            date,
            format!("Payroll: {}", period),
        )
        .reference(format!("PAYROLL-{}", run.id))
        .debit(ctx.code(AccountRole::WagesExpense), totals.gross, "Gross payroll")
        .credit(ctx.code(AccountRole::Cash), totals.net_cash, "Net wages paid")
        .credit(ctx.code(AccountRole::BenefitsPayable), totals.benefits, "Benefits accrued")
        .credit(ctx.code(AccountRole::WorkerLoans), totals.reclaim, "Loan reclaim")
        .build();
        Ok((!intent.is_empty()).then_some(intent))
    }
}

#[async_trait]
impl SourceAdapter for PayrollAdapter {
    fn domain(&self) -> SourceDomain {
        SourceDomain::Payroll
    }

    fn unavailable(&self, caps: &SchemaCapabilities) -> Option<String> {
        (!caps.payroll).then(|| {
            "Payroll tables not found (expected `payroll_runs` and `payroll_entries`).".to_string()
        })
    }

    async fn scan(
        &self,
        ctx: &EngineContext,
        _caps: &SchemaCapabilities,
        since: Option<NaiveDate>,
    ) -> EngineResult<ScanOutput> {
        let runs = SourceRepo::payroll_runs(ctx.pool(), since)
            .await
            .map_err(|e| EngineError::adapter(self.domain(), e))?;
        let entries = SourceRepo::payroll_entries(ctx.pool(), since)
            .await
            .map_err(|e| EngineError::adapter(self.domain(), e))?;

        let mut by_run: HashMap<i64, Vec<&PayrollEntryRow>> = HashMap::new();
        for entry in &entries {
            by_run.entry(entry.payroll_run_id).or_default().push(entry);
        }

        let mut output = ScanOutput::new();
        for run in &runs {
            let run_entries = by_run.get(&run.id).map(Vec::as_slice).unwrap_or(&[]);
            output.items.push(ScanItem::from_result(
                Fingerprint::payroll_run(run.id),
                Self::intent_for(ctx, run, run_entries),
            ));
        }

        debug!(records = output.items.len(), "Payroll runs scanned");
        Ok(output)
    }
}
