//! The module contains the errors the engine can throw.
//!
//! Every variant belongs to one [`ErrorKind`], so callers can decide how to
//! react without matching on each guard:
//!
//! - [`ErrorKind::Validation`]: malformed input, nothing was written.
//! - [`ErrorKind::InvariantViolation`]: the operation would break a ledger
//!   guarantee (overdraft, over-application, oversell, ...).
//! - [`ErrorKind::Referential`]: an id does not exist or does not belong to
//!   the referenced document.
//! - [`ErrorKind::ConcurrencyConflict`]: a compare-and-swap lost against a
//!   concurrent writer; re-read and retry.
//! - [`ErrorKind::Storage`]: the database failed.
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Insufficient credit: {0}")]
    InsufficientCredit(String),
    #[error("Credit exceeds the remaining due: {0}")]
    OverApplication(String),
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),
    #[error("Return exceeds remaining quantity: {0}")]
    ReturnExceedsRemaining(String),
    #[error("Unit of measure locked: {0}")]
    UomLocked(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Reference mismatch: {0}")]
    ReferenceMismatch(String),
    #[error("Concurrent update: {0}")]
    ConcurrencyConflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InvariantViolation,
    Referential,
    ConcurrencyConflict,
    Storage,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::ExistingKey(_) => ErrorKind::Validation,
            Self::InsufficientCredit(_)
            | Self::OverApplication(_)
            | Self::InsufficientStock(_)
            | Self::ReturnExceedsRemaining(_)
            | Self::UomLocked(_)
            | Self::InvalidTransition(_) => ErrorKind::InvariantViolation,
            Self::KeyNotFound(_) | Self::ReferenceMismatch(_) => ErrorKind::Referential,
            Self::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
            Self::Database(_) => ErrorKind::Storage,
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InsufficientCredit(a), Self::InsufficientCredit(b)) => a == b,
            (Self::OverApplication(a), Self::OverApplication(b)) => a == b,
            (Self::InsufficientStock(a), Self::InsufficientStock(b)) => a == b,
            (Self::ReturnExceedsRemaining(a), Self::ReturnExceedsRemaining(b)) => a == b,
            (Self::UomLocked(a), Self::UomLocked(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ReferenceMismatch(a), Self::ReferenceMismatch(b)) => a == b,
            (Self::ConcurrencyConflict(a), Self::ConcurrencyConflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_map_to_invariant_violation() {
        assert_eq!(
            EngineError::OverApplication("sale".to_string()).kind(),
            ErrorKind::InvariantViolation
        );
        assert_eq!(
            EngineError::UomLocked("box".to_string()).kind(),
            ErrorKind::InvariantViolation
        );
        assert_eq!(
            EngineError::KeyNotFound("product".to_string()).kind(),
            ErrorKind::Referential
        );
        assert_eq!(
            EngineError::Database(DbErr::Custom("disk".to_string())).kind(),
            ErrorKind::Storage
        );
    }
}
