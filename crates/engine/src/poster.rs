//! Journal poster
//!
//! The only component that writes journal entries. A fingerprint is posted
//! at most once: the pre-check skips known fingerprints and the UNIQUE
//! constraint settles races between concurrent passes.

use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use drillbooks_core::PostingIntent;
use drillbooks_persistence::{AccountRepo, InsertOutcome, JournalRepo};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Result of posting one intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PostOutcome {
    Posted { entry_id: i64 },
    /// Fingerprint already has an entry
    Skipped,
    /// Intent is invalid; nothing was written
    Rejected { reason: String },
}

impl PostOutcome {
    pub fn is_posted(&self) -> bool {
        matches!(self, PostOutcome::Posted { .. })
    }
}

/// Writes validated intents as journal entries
pub struct JournalPoster<'a> {
    ctx: &'a EngineContext,
    /// Active account code → id
    accounts: HashMap<String, i64>,
}

impl<'a> JournalPoster<'a> {
    /// Load the active account map. Failure is a setup failure.
    pub async fn load(ctx: &'a EngineContext) -> EngineResult<Self> {
        let accounts = AccountRepo::active_code_map(ctx.pool())
            .await
            .map_err(|e| EngineError::Setup(format!("cannot load account codes: {}", e)))?;
        Ok(Self { ctx, accounts })
    }

    /// Account codes the poster can write to
    pub fn knows(&self, code: &str) -> bool {
        self.accounts.contains_key(code)
    }

    /// Post one intent.
    ///
    /// Storage errors propagate; the entry is never partially written.
    pub async fn post(&self, intent: &PostingIntent) -> EngineResult<PostOutcome> {
        let pool = self.ctx.pool();

        if JournalRepo::fingerprint_exists(pool, &intent.fingerprint).await? {
            debug!(fingerprint = %intent.fingerprint, "Already posted");
            return Ok(PostOutcome::Skipped);
        }

        if let Err(e) = intent.validate(self.ctx.config().tolerance) {
            return Ok(PostOutcome::Rejected {
                reason: e.to_string(),
            });
        }

        if let Some(line) = intent.lines.iter().find(|l| !self.knows(&l.account_code)) {
            return Ok(PostOutcome::Rejected {
                reason: format!("Unknown or inactive account code: {}", line.account_code),
            });
        }

        match JournalRepo::insert_entry(pool, intent, &self.accounts).await? {
            InsertOutcome::Inserted(entry_id) => {
                info!(
                    fingerprint = %intent.fingerprint,
                    entry_id,
                    amount = %intent.total_debits(),
                    "Journal entry posted"
                );
                Ok(PostOutcome::Posted { entry_id })
            }
            InsertOutcome::Duplicate => Ok(PostOutcome::Skipped),
        }
    }
}
