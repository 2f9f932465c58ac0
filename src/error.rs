//! Inventory error types.
//!
//! Defines error variants for registry, workflow, and catalog operations.
//! Every failure carries a stable machine-readable code surfaced to API
//! callers; nothing is swallowed.

use crib_store::StoreError;
use thiserror::Error;

pub type CribResult<T> = Result<T, CribError>;

#[derive(Debug, Error)]
pub enum CribError {
    /// Client-side mistake: missing selection, bad quantity, guarded delete.
    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
    },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// The unit was not available when the issue transition reached it —
    /// either it never was, or a concurrent issue won the race.
    #[error("tool unit {unit_code} just became unavailable ({actual})")]
    UnitUnavailable { unit_code: String, actual: String },

    /// The unit changed between the workflow's read and its guarded write.
    #[error("tool unit {unit_code} was modified concurrently")]
    UnitConflict { unit_code: String },

    /// Returning a loan that is already closed. Reported as a no-op by the
    /// batch workflow, never as a duplicate ledger append.
    #[error("loan {0} is already returned")]
    LoanAlreadyReturned(String),

    #[error(transparent)]
    Auth(#[from] crib_auth::AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CribError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(what: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            CribError::Validation { code, .. } => code,
            CribError::NotFound { .. } => "not_found",
            CribError::UnitUnavailable { .. } => "unit_unavailable",
            CribError::UnitConflict { .. } => "version_conflict",
            CribError::LoanAlreadyReturned(_) => "loan_already_returned",
            CribError::Auth(err) => err.code(),
            CribError::Store(StoreError::NotFound { .. }) => "not_found",
            CribError::Store(_) => "storage_error",
        }
    }
}
