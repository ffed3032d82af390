//! Engine errors
//!
//! Storage and configuration failures. Per-record problems are not errors:
//! they are collected as discrepancies in the run report.

use drillbooks_core::SourceDomain;
use thiserror::Error;

/// Reconciliation engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    // === Setup errors ===
    #[error("Ledger store unusable: {0}")]
    Setup(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // === Adapter errors ===
    #[error("Adapter {domain} failed: {source}")]
    Adapter {
        domain: SourceDomain,
        #[source]
        source: drillbooks_persistence::PersistenceError,
    },

    // === Wrapped errors ===
    #[error("Persistence error: {0}")]
    Persistence(#[from] drillbooks_persistence::PersistenceError),

    #[error("Core error: {0}")]
    Core(#[from] drillbooks_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn adapter(domain: SourceDomain, source: drillbooks_persistence::PersistenceError) -> Self {
        Self::Adapter { domain, source }
    }

    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Setup(_))
    }
}
