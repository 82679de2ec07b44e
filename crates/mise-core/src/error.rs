use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::RecordKind;
use crate::units::Unit;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failures surfaced to the caller. Messages name the operation and the
/// entity so they can be shown as-is.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot {operation} {entity}: quantity must be positive")]
    InvalidQuantity {
        operation: &'static str,
        entity: String,
    },

    #[error("cannot {operation} {entity}: total cost cannot be negative")]
    InvalidCost {
        operation: &'static str,
        entity: String,
    },

    #[error("cannot cost recipe {recipe}: yield must be positive")]
    InvalidYield { recipe: String },

    #[error("cannot convert {from} to {to} without a conversion factor")]
    UnsupportedConversion { from: Unit, to: Unit },

    #[error("recipe {recipe} includes itself ({chain})")]
    CyclicRecipeReference { recipe: String, chain: String },

    #[error("cannot {operation} {entity}: stock would become {resulting}")]
    NegativeStockResult {
        operation: &'static str,
        entity: String,
        resulting: Decimal,
    },

    #[error("cannot {operation} {entity}: ingredient is inactive")]
    InactiveIngredient {
        operation: &'static str,
        entity: String,
    },

    #[error("cannot {operation} {entity}: it kept changing while being written")]
    Conflict {
        operation: &'static str,
        entity: String,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: Uuid },

    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("storage failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Raised by a store when an ingredient write is based on a stale read.
#[derive(Debug, Error)]
#[error("ingredient {id} is no longer at revision {expected}")]
pub struct RevisionConflict {
    pub id: Uuid,
    pub expected: u64,
}

impl RevisionConflict {
    /// Whether a store error is a lost race rather than a failure.
    pub fn is_conflict(err: &anyhow::Error) -> bool {
        err.downcast_ref::<RevisionConflict>().is_some()
    }
}

impl EngineError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether the error was raised by input checks rather than by the store.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            EngineError::Store(_) | EngineError::NotFound { .. } | EngineError::Conflict { .. }
        )
    }
}
