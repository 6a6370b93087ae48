use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::CommitmentStatus;
use crate::storage::UniqueViolation;

/// Every failure the back office reports to its callers. All variants are
/// recoverable; the caller decides how to present them.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{field} '{value}' is already registered")]
    DuplicateKey { field: &'static str, value: String },

    #[error("transition from {from} to {to} not permitted")]
    InvalidTransition {
        from: CommitmentStatus,
        to: CommitmentStatus,
    },

    #[error("commitment {number} is PAGO and can no longer be changed")]
    ImmutableState { number: String },

    #[error("{entity} {id} was changed concurrently; reload and retry")]
    ConcurrentUpdate { entity: &'static str, id: Uuid },

    #[error("amount exceeds contract balance: total would be {attempted}, ceiling is {ceiling}")]
    BudgetExceeded { attempted: Decimal, ceiling: Decimal },

    #[error("{0}")]
    Validation(String),

    #[error("unknown commitment status '{0}'")]
    UnknownStatus(String),

    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NotFound",
            CoreError::DuplicateKey { .. } => "DuplicateKey",
            CoreError::InvalidTransition { .. } => "InvalidTransition",
            CoreError::ImmutableState { .. } => "ImmutableState",
            CoreError::ConcurrentUpdate { .. } => "ConcurrentUpdate",
            CoreError::BudgetExceeded { .. } => "BudgetExceeded",
            CoreError::Validation(_) => "ValidationError",
            CoreError::UnknownStatus(_) => "UnknownStatus",
            CoreError::Storage(_) => "Storage",
        }
    }
}

// Stores report uniqueness races through `UniqueViolation`; everything else
// stays an opaque storage failure.
impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<UniqueViolation>() {
            Ok(violation) => CoreError::DuplicateKey {
                field: violation.field,
                value: violation.value,
            },
            Err(err) => CoreError::Storage(err),
        }
    }
}
