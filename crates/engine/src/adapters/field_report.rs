//! Field report adapter
//!
//! One intent per report: revenue recognition against the day's cash
//! movements and expenses.

use super::{checked_sides, money, overflow, record_date, ScanItem, ScanOutput, SourceAdapter};
use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use drillbooks_core::{
    AccountRole, ClassificationPolicy, Discrepancy, DiscrepancyKind, Fingerprint, PostingIntent,
    SourceDomain, Tolerance,
};
use drillbooks_persistence::sqlite::FieldReportRow;
use drillbooks_persistence::{SchemaCapabilities, SourceRepo};
use rust_decimal::Decimal;
use tracing::debug;

pub struct FieldReportAdapter;

/// Parsed amounts of one report, rounded to ledger precision
#[derive(Debug, Clone, Default)]
struct ReportAmounts {
    contract_sum: Decimal,
    rig_fee_charged: Decimal,
    rig_fee_collected: Decimal,
    cash_received: Decimal,
    materials_income: Decimal,
    materials_cost: Decimal,
    momo_transfer: Decimal,
    cash_given: Decimal,
    bank_deposit: Decimal,
    total_wages: Decimal,
    total_expenses: Decimal,
}

impl ReportAmounts {
    fn parse(row: &FieldReportRow) -> Result<Self, String> {
        let amounts = Self {
            contract_sum: money("contract_sum", &row.contract_sum)?,
            rig_fee_charged: money("rig_fee_charged", &row.rig_fee_charged)?,
            rig_fee_collected: money("rig_fee_collected", &row.rig_fee_collected)?,
            cash_received: money("cash_received", &row.cash_received)?,
            materials_income: money("materials_income", &row.materials_income)?,
            materials_cost: money("materials_cost", &row.materials_cost)?,
            momo_transfer: money("momo_transfer", &row.momo_transfer)?,
            cash_given: money("cash_given", &row.cash_given)?,
            bank_deposit: money("bank_deposit", &row.bank_deposit)?,
            total_wages: money("total_wages", &row.total_wages)?,
            total_expenses: money("total_expenses", &row.total_expenses)?,
        };

        if amounts.rig_fee_collected > amounts.rig_fee_charged {
            return Err(format!(
                "rig fee collected {} exceeds rig fee charged {}",
                amounts.rig_fee_collected, amounts.rig_fee_charged
            ));
        }
        Ok(amounts)
    }

    /// Expenses other than wages and materials
    fn daily_expenses(&self) -> Result<Decimal, String> {
        self.total_expenses
            .checked_sub(self.total_wages)
            .and_then(|d| d.checked_sub(self.materials_cost))
            .ok_or_else(|| overflow("daily expenses"))
    }
}

impl FieldReportAdapter {
    /// Convert one report; `Ok(None)` when nothing is postable
    pub fn intent_for(
        ctx: &EngineContext,
        row: &FieldReportRow,
    ) -> Result<Option<PostingIntent>, String> {
        let a = ReportAmounts::parse(row)?;
        let date = record_date("report_date", row.report_date.as_deref())?;
        let code = |role| ctx.code(role);

        let site = row.site_name.as_deref().unwrap_or("");
        let client = row.client_name.as_deref().unwrap_or("");
        let mut builder = PostingIntent::builder(
            Fingerprint::field_report(row.id),
            date,
            format!("Field Report: {} - {}", site, client),
        );
        if let Some(reference) = row.report_id.as_deref().filter(|r| !r.is_empty()) {
            builder = builder.reference(reference);
        }

        // Revenue
        builder = builder.transfer(
            code(AccountRole::AccountsReceivable),
            code(AccountRole::ContractRevenue),
            a.contract_sum,
            "Contract sum",
        );
        if a.rig_fee_charged > Decimal::ZERO {
            builder = builder
                .debit(code(AccountRole::Cash), a.rig_fee_collected, "Rig fee collected")
                .debit(
                    code(AccountRole::AccountsReceivable),
                    a.rig_fee_charged - a.rig_fee_collected,
                    "Rig fee outstanding",
                )
                .credit(code(AccountRole::RigFeeRevenue), a.rig_fee_charged, "Rig fee charged");
        }
        builder = builder
            .transfer(
                code(AccountRole::Cash),
                code(AccountRole::Bank),
                a.cash_received,
                "Cash received from company",
            )
            .transfer(
                code(AccountRole::Cash),
                code(AccountRole::MaterialsRevenue),
                a.materials_income,
                "Materials income",
            );

        // Expenses
        builder = builder
            .transfer(
                code(AccountRole::MaterialsExpense),
                code(AccountRole::Cash),
                a.materials_cost,
                "Materials cost",
            )
            .transfer(
                code(AccountRole::WagesExpense),
                code(AccountRole::Cash),
                a.total_wages,
                "Cash paid for wages",
            );
        let daily = a.daily_expenses()?;
        if daily > Decimal::ZERO {
            builder = builder.transfer(
                code(AccountRole::OperatingExpense),
                code(AccountRole::Cash),
                daily,
                "Daily expenses",
            );
        }

        // Cash movements
        builder = builder
            .transfer(
                code(AccountRole::MobileMoney),
                code(AccountRole::Cash),
                a.momo_transfer,
                "MoMo transfer",
            )
            .transfer(
                code(AccountRole::Bank),
                code(AccountRole::Cash),
                a.cash_given,
                "Cash given to company",
            )
            .transfer(
                code(AccountRole::Bank),
                code(AccountRole::Cash),
                a.bank_deposit,
                "Bank deposit",
            );

        let intent = checked_sides(builder.build())?;
        Ok((!intent.is_empty()).then_some(intent))
    }

    /// Recorded net profit vs total income - total expenses
    pub fn check_net_profit(
        policy: &ClassificationPolicy,
        tolerance: Tolerance,
        row: &FieldReportRow,
    ) -> Option<Discrepancy> {
        let recorded = amount_signed(row.net_profit.as_deref()?)?;
        let income = amount_signed(&row.total_income)?;
        let expenses = amount_signed(&row.total_expenses)?;
        let calculated = income.checked_sub(expenses)?;
        if tolerance.approx_eq(recorded, calculated) {
            return None;
        }

        let label = row.report_id.clone().unwrap_or_else(|| row.id.to_string());
        Some(
            policy
                .classify(
                    DiscrepancyKind::CalculationMismatch,
                    format!(
                        "Report {}: Net profit mismatch. Recorded: {}, Calculated: {}",
                        label, recorded, calculated
                    ),
                )
                .with_fingerprint(&Fingerprint::field_report(row.id)),
        )
    }
}

/// Net profit may legitimately be negative
fn amount_signed(raw: &str) -> Option<Decimal> {
    drillbooks_persistence::sqlite::parse_decimal(raw).ok()
}

#[async_trait]
impl SourceAdapter for FieldReportAdapter {
    fn domain(&self) -> SourceDomain {
        SourceDomain::FieldReports
    }

    fn unavailable(&self, caps: &SchemaCapabilities) -> Option<String> {
        (!caps.field_reports).then(|| "Field report table not found (expected `field_reports`).".to_string())
    }

    async fn scan(
        &self,
        ctx: &EngineContext,
        caps: &SchemaCapabilities,
        since: Option<NaiveDate>,
    ) -> EngineResult<ScanOutput> {
        let rows = SourceRepo::field_reports(ctx.pool(), caps, since)
            .await
            .map_err(|e| EngineError::adapter(self.domain(), e))?;

        let config = ctx.config();
        let mut output = ScanOutput::new();
        for row in &rows {
            let fingerprint = Fingerprint::field_report(row.id);
            let item = ScanItem::from_result(fingerprint, Self::intent_for(ctx, row));
            if let Some(note) = Self::check_net_profit(&config.policy, config.tolerance, row) {
                output.notes.push(note);
            }
            output.items.push(item);
        }

        debug!(records = output.items.len(), "Field reports scanned");
        Ok(output)
    }
}
