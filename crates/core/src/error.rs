//! # Error Module
//!
//! Domain errors for the Drillbooks ledger core, using thiserror.

use rust_decimal::Decimal;
use thiserror::Error;

/// Core domain errors.
///
/// Pure ledger-rule violations, independent of storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // === Intent errors ===
    #[error("Posting intent has no lines")]
    EmptyIntent,

    #[error("Intent unbalanced: debits {debits}, credits {credits}")]
    Unbalanced { debits: Decimal, credits: Decimal },

    #[error("Line {index} must carry exactly one non-zero side")]
    InvalidLineSides { index: usize },

    #[error("Line {index} has a negative amount")]
    NegativeAmount { index: usize },

    #[error("Account code cannot be empty")]
    EmptyAccountCode,

    // === Fingerprint errors ===
    #[error("Invalid fingerprint format: {0}")]
    InvalidFingerprint(String),

    #[error("Unknown fingerprint kind: {0}")]
    UnknownFingerprintKind(String),

    // === Enum parsing ===
    #[error("Invalid {field}: {value}")]
    InvalidEnumValue { field: &'static str, value: String },
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create an invalid enum value error
    pub fn invalid_enum(field: &'static str, value: &str) -> Self {
        Self::InvalidEnumValue {
            field,
            value: value.to_string(),
        }
    }

    /// Whether the error is a debit/credit imbalance
    pub fn is_unbalanced(&self) -> bool {
        matches!(self, CoreError::Unbalanced { .. })
    }
}
