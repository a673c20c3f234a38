//! Observable events for roadbook
//!
//! Every log line the engine and CLI emit carries one of these as its
//! `event` field, so logs can be filtered by what happened rather than by
//! message text.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Startup
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Metadata catalog built
    CatalogBuilt,
    /// Store opened from its snapshot
    StoreOpened,

    // Mutations
    /// A record was persisted
    RecordCreated,
    /// A record was changed
    RecordUpdated,
    /// An update changed nothing and was not written
    UpdateUnchanged,
    /// A record and its dependents were deleted
    RecordsDeleted,
    /// An operation was rejected with validation errors
    OperationRejected,

    // Persistence
    /// Store snapshot written to disk
    SnapshotSaved,
    /// Built-in descriptors exported to the schema directory
    DescriptorsExported,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CatalogBuilt => "CATALOG_BUILT",
            Event::StoreOpened => "STORE_OPENED",

            Event::RecordCreated => "RECORD_CREATED",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::UpdateUnchanged => "UPDATE_UNCHANGED",
            Event::RecordsDeleted => "RECORDS_DELETED",
            Event::OperationRejected => "OPERATION_REJECTED",

            Event::SnapshotSaved => "SNAPSHOT_SAVED",
            Event::DescriptorsExported => "DESCRIPTORS_EXPORTED",
        }
    }

    /// Whether the event reports a refused request
    pub fn is_rejection(&self) -> bool {
        matches!(self, Event::OperationRejected)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
