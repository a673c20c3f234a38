//! # Store Errors

use thiserror::Error;

use super::record::RecordKey;
use super::Precondition;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Type not registered in store: {0}")]
    UnknownTable(String),

    #[error("Record not found: {0}")]
    MissingRecord(RecordKey),

    #[error("Record already persisted: {0}")]
    AlreadyPersisted(RecordKey),

    #[error("Record has no identity: {0}")]
    MissingIdentity(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Precondition failed: {0}")]
    PreconditionFailed(Precondition),
}

impl StoreError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::UnknownTable(_) => "ROADBOOK_STORE_UNKNOWN_TABLE",
            StoreError::MissingRecord(_) => "ROADBOOK_STORE_MISSING_RECORD",
            StoreError::AlreadyPersisted(_) => "ROADBOOK_STORE_ALREADY_PERSISTED",
            StoreError::MissingIdentity(_) => "ROADBOOK_STORE_MISSING_IDENTITY",
            StoreError::Snapshot(_) => "ROADBOOK_STORE_SNAPSHOT",
            StoreError::LockPoisoned => "ROADBOOK_STORE_LOCK_POISONED",
            StoreError::PreconditionFailed(_) => "ROADBOOK_STORE_PRECONDITION_FAILED",
        }
    }
}
