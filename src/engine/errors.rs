//! # Engine Errors
//!
//! Structural failures (`UnknownType`, `RecordNotFound`) end an operation
//! before any work is done. Validation failures are gathered into a single
//! [`Rejection`] carrying every problem found.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::codec::FormValues;
use crate::schema::{ErrorKind, ValidationResult};
use crate::store::{RecordId, StoreError};

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// A create or update refused because of validation errors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// Every problem found, in field order
    pub errors: ValidationResult,
    /// Field values of the untouched record (update only), for redisplay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<FormValues>,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.errors)
    }
}

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("{type_name} with id {id} not found")]
    RecordNotFound { type_name: String, id: RecordId },

    #[error("Validation failed: {0}")]
    Rejected(Rejection),

    #[error("Type {0} is in the catalog but not in the store")]
    UnregisteredType(String),

    /// A concurrent write changed what a delete was planned against
    #[error("Conflicting change: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Error kind, for the failures the engine reports as one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EngineError::UnknownType(_) => Some(ErrorKind::UnknownType),
            EngineError::RecordNotFound { .. } => Some(ErrorKind::RecordNotFound),
            _ => None,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::UnknownType(_) => ErrorKind::UnknownType.code(),
            EngineError::RecordNotFound { .. } => ErrorKind::RecordNotFound.code(),
            EngineError::Rejected(_) => "ROADBOOK_VALIDATION_FAILED",
            EngineError::UnregisteredType(_) => "ROADBOOK_UNREGISTERED_TYPE",
            EngineError::Conflict(_) => "ROADBOOK_CONFLICT",
            EngineError::Store(e) => e.code(),
        }
    }

    /// The rejection, if this is a validation failure
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            EngineError::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    /// Validation errors, if this is a validation failure
    pub fn validation(&self) -> Option<&ValidationResult> {
        self.rejection().map(|r| &r.errors)
    }
}
