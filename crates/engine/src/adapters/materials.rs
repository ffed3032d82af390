//! Materials purchase adapter

use super::{amount, overflow, record_date, ScanItem, ScanOutput, SourceAdapter};
use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use drillbooks_core::{round2, AccountRole, Fingerprint, PostingIntent, SourceDomain};
use drillbooks_persistence::sqlite::MaterialsPurchaseRow;
use drillbooks_persistence::{SchemaCapabilities, SourceRepo};
use tracing::debug;

pub struct MaterialsAdapter;

impl MaterialsAdapter {
    /// Dr inventory, Cr cash (or accounts payable for purchases on credit)
    pub fn intent_for(
        ctx: &EngineContext,
        row: &MaterialsPurchaseRow,
    ) -> Result<Option<PostingIntent>, String> {
        let quantity = amount("quantity_received", &row.quantity_received)?;
        let unit_cost = amount("unit_cost", &row.unit_cost)?;
        let date = record_date("transaction_date", row.transaction_date.as_deref())?;
        let total = unit_cost
            .checked_mul(quantity)
            .map(round2)
            .ok_or_else(|| overflow("purchase total"))?;

        let on_credit = row
            .payment_method
            .as_deref()
            .map_or(false, |m| m.trim().eq_ignore_ascii_case("credit"));
        let credit_role = if on_credit {
            AccountRole::AccountsPayable
        } else {
            AccountRole::Cash
        };

        let material = row
            .material_type
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("Materials");
        let intent = PostingIntent::builder(
            Fingerprint::materials_purchase(row.id),
            date,
            format!("Purchase: {}", material),
        )
        .reference(format!("MAT-{}", row.id))
        .transfer(
            ctx.code(AccountRole::MaterialsInventory),
            ctx.code(credit_role),
            total,
            "Materials purchase",
        )
        .build();
        Ok((!intent.is_empty()).then_some(intent))
    }
}

#[async_trait]
impl SourceAdapter for MaterialsAdapter {
    fn domain(&self) -> SourceDomain {
        SourceDomain::Materials
    }

    fn unavailable(&self, caps: &SchemaCapabilities) -> Option<String> {
        (!caps.materials)
            .then(|| "Materials table not found (expected `materials_transactions`).".to_string())
    }

    async fn scan(
        &self,
        ctx: &EngineContext,
        caps: &SchemaCapabilities,
        since: Option<NaiveDate>,
    ) -> EngineResult<ScanOutput> {
        let rows = SourceRepo::materials_purchases(ctx.pool(), caps, since)
            .await
            .map_err(|e| EngineError::adapter(self.domain(), e))?;

        let mut output = ScanOutput::new();
        output.items = rows
            .iter()
            .map(|row| {
                ScanItem::from_result(Fingerprint::materials_purchase(row.id), Self::intent_for(ctx, row))
            })
            .collect();

        debug!(records = output.items.len(), "Materials purchases scanned");
        Ok(output)
    }
}
