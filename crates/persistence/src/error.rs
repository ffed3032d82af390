//! # Persistence Errors
//!
//! Error types for the persistence layer, wrapping sqlx and IO errors.

use drillbooks_core::CoreError;
use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    // === Database errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity} with id {id}")]
    AlreadyExists { entity: String, id: String },

    // === Run log errors ===
    #[error("Run log IO error: {0}")]
    RunLogIo(#[from] std::io::Error),

    #[error("Run log serialization error: {0}")]
    RunLogSerialization(#[from] serde_json::Error),

    // === Conversion errors ===
    #[error("Invalid decimal value: {0}")]
    InvalidDecimal(String),

    #[error("Invalid stored value: {0}")]
    InvalidValue(#[from] CoreError),
}

/// Result type alias for PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &str, id: &str) -> Self {
        Self::AlreadyExists {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Whether the error came from a UNIQUE constraint
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::AlreadyExists { .. } => true,
            Self::Database(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

/// Whether a raw sqlx error is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}
