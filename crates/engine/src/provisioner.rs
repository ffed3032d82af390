//! Chart of accounts provisioner
//!
//! Idempotent bootstrap: creates the canonical accounts that do not exist
//! yet and never touches existing ones.

use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use drillbooks_core::{AccountType, Discrepancy, DiscrepancyKind};
use drillbooks_persistence::AccountRepo;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// What a provisioning pass did
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProvisionOutcome {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    #[serde(skip)]
    pub discrepancies: Vec<Discrepancy>,
}

/// Ensures the canonical chart exists before any posting
pub struct Provisioner<'a> {
    ctx: &'a EngineContext,
}

impl<'a> Provisioner<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// Create every missing canonical account.
    ///
    /// Failing to read the existing codes is a setup failure. A single
    /// account that cannot be created becomes a critical discrepancy and the
    /// pass goes on.
    pub async fn ensure_accounts(&self) -> EngineResult<ProvisionOutcome> {
        let pool = self.ctx.pool();
        let policy = &self.ctx.config().policy;

        let existing: HashMap<String, String> = AccountRepo::list(pool)
            .await
            .map_err(|e| EngineError::Setup(format!("cannot read chart of accounts: {}", e)))?
            .into_iter()
            .map(|row| (row.code, row.account_type))
            .collect();

        let mut outcome = ProvisionOutcome::default();

        for spec in self.ctx.chart().specs() {
            if let Some(stored) = existing.get(&spec.code) {
                let matches = AccountType::parse(stored).map_or(false, |t| t == spec.account_type);
                if !matches {
                    warn!(code = %spec.code, stored = %stored, expected = %spec.account_type, "Account type conflict");
                    outcome.discrepancies.push(
                        policy
                            .classify(
                                DiscrepancyKind::AccountTypeConflict,
                                format!(
                                    "Account {} exists as {} but the chart expects {} ({})",
                                    spec.code, stored, spec.account_type, spec.name
                                ),
                            )
                            .with_reference(spec.code.clone()),
                    );
                }
                outcome.existing.push(spec.code.clone());
                continue;
            }

            match AccountRepo::insert(pool, spec).await {
                Ok(_) => outcome.created.push(spec.code.clone()),
                // Created by a concurrent pass since the read
                Err(e) if e.is_already_exists() => outcome.existing.push(spec.code.clone()),
                Err(e) => {
                    warn!(code = %spec.code, error = %e, "Failed to create account");
                    outcome.discrepancies.push(
                        policy
                            .classify(
                                DiscrepancyKind::ProvisioningFailure,
                                format!("Could not create account {} ({}): {}", spec.code, spec.name, e),
                            )
                            .with_reference(spec.code.clone()),
                    );
                }
            }
        }

        info!(
            created = outcome.created.len(),
            existing = outcome.existing.len(),
            "Chart of accounts provisioned"
        );
        Ok(outcome)
    }
}
