//! Worker loan adapter
//!
//! Disbursements move cash into the loans receivable; repayments move it
//! back. Each has its own fingerprint kind, so a loan id and a repayment id
//! that happen to be equal never collide.

use super::{amount, record_date, ScanItem, ScanOutput, SourceAdapter};
use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use drillbooks_core::{AccountRole, Fingerprint, PostingIntent, SourceDomain};
use drillbooks_persistence::sqlite::{LoanRow, RepaymentRow};
use drillbooks_persistence::{SchemaCapabilities, SourceRepo};
use tracing::{debug, warn};

pub struct LoanAdapter;

impl LoanAdapter {
    pub fn disbursement_intent(
        ctx: &EngineContext,
        row: &LoanRow,
    ) -> Result<Option<PostingIntent>, String> {
        let value = amount("loan_amount", &row.loan_amount)?;
        let date = record_date("issue_date", row.issue_date.as_deref())?;
        let worker = row.worker_name.as_deref().unwrap_or("Unknown");

        let intent = PostingIntent::builder(
            Fingerprint::loan_disbursement(row.id),
            date,
            format!("Loan to {}", worker),
        )
        .reference(format!("LOAN-{}", row.id))
        .transfer(
            ctx.code(AccountRole::WorkerLoans),
            ctx.code(AccountRole::Cash),
            value,
            "Loan disbursement",
        )
        .build();
        Ok((!intent.is_empty()).then_some(intent))
    }

    pub fn repayment_intent(
        ctx: &EngineContext,
        row: &RepaymentRow,
    ) -> Result<Option<PostingIntent>, String> {
        let value = amount("repayment_amount", &row.repayment_amount)?;
        let date = record_date("repayment_date", row.repayment_date.as_deref())?;
        let worker = row.worker_name.as_deref().unwrap_or("Unknown");

        let intent = PostingIntent::builder(
            Fingerprint::loan_repayment(row.id),
            date,
            format!("Loan repayment from {}", worker),
        )
        .reference(format!("LOAN-{}", row.loan_id))
        .transfer(
            ctx.code(AccountRole::Cash),
            ctx.code(AccountRole::WorkerLoans),
            value,
            "Loan repayment",
        )
        .build();
        Ok((!intent.is_empty()).then_some(intent))
    }
}

#[async_trait]
impl SourceAdapter for LoanAdapter {
    fn domain(&self) -> SourceDomain {
        SourceDomain::Loans
    }

    fn unavailable(&self, caps: &SchemaCapabilities) -> Option<String> {
        caps.loans_table
            .is_none()
            .then(|| "Loan table not found (expected `worker_loans` or `loans`).".to_string())
    }

    async fn scan(
        &self,
        ctx: &EngineContext,
        caps: &SchemaCapabilities,
        since: Option<NaiveDate>,
    ) -> EngineResult<ScanOutput> {
        let mut output = ScanOutput::new();
        let Some(loans_table) = caps.loans_table else {
            output.complete = false;
            return Ok(output);
        };

        let loans = SourceRepo::loans(ctx.pool(), loans_table, since)
            .await
            .map_err(|e| EngineError::adapter(self.domain(), e))?;
        for row in &loans {
            output.items.push(ScanItem::from_result(
                Fingerprint::loan_disbursement(row.id),
                Self::disbursement_intent(ctx, row),
            ));
        }

        match caps.repayments_table {
            Some(repayments_table) => {
                let repayments = SourceRepo::repayments(ctx.pool(), repayments_table, loans_table, since)
                    .await
                    .map_err(|e| EngineError::adapter(self.domain(), e))?;
                for row in &repayments {
                    output.items.push(ScanItem::from_result(
                        Fingerprint::loan_repayment(row.id),
                        Self::repayment_intent(ctx, row),
                    ));
                }
            }
            None => {
                warn!(loans_table, "Loan repayment table not found");
                output
                    .warnings
                    .push("Loan repayment table not found; repayments were not scanned.".to_string());
                output.complete = false;
            }
        }

        debug!(records = output.items.len(), "Loans scanned");
        Ok(output)
    }
}
