//! Record persistence
//!
//! The engine talks to storage only through the [`Store`] trait. Reads
//! address records by type name and identity; writes are grouped into a
//! [`WriteBatch`] that a store applies atomically: either every mutation
//! in the batch takes effect or none does.
//!
//! A batch also carries the [`Precondition`]s its writes were planned
//! under. The store re-checks them under its own guard, so a batch planned
//! from reads that went stale in the meantime fails instead of breaking a
//! reference or a unique field.

use std::fmt;

use crate::codec::FieldValue;

mod errors;
mod memory;
mod record;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use record::{Record, RecordId, RecordKey};

/// One mutation inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a new record; the store assigns its identity
    Persist(Record),
    /// Replace the stored values of an existing record
    Merge(Record),
    /// Delete an existing record
    Remove(RecordKey),
    /// Fail the batch unless the condition holds after the mutations before it
    Check(Precondition),
}

/// Condition a batch was planned under.
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// The record that reference `field` points at exists
    Exists { field: String, key: RecordKey },
    /// No record of `type_name` other than `except` holds `value` in `field`
    Unique {
        type_name: String,
        field: String,
        value: FieldValue,
        except: Option<RecordId>,
    },
    /// No record of `holder` references `key` through `field`
    Unreferenced {
        key: RecordKey,
        holder: String,
        field: String,
    },
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::Exists { field, key } => {
                write!(f, "{} referenced by '{}' no longer exists", key, field)
            }
            Precondition::Unique {
                type_name,
                field,
                value,
                ..
            } => write!(f, "{}.{} value '{}' is already taken", type_name, field, value),
            Precondition::Unreferenced { key, holder, field } => {
                write!(f, "{} is still referenced by {}.{}", key, holder, field)
            }
        }
    }
}

/// Ordered set of mutations applied as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persist(mut self, record: Record) -> Self {
        self.mutations.push(Mutation::Persist(record));
        self
    }

    pub fn merge(mut self, record: Record) -> Self {
        self.mutations.push(Mutation::Merge(record));
        self
    }

    pub fn remove(mut self, key: RecordKey) -> Self {
        self.mutations.push(Mutation::Remove(key));
        self
    }

    pub fn check(mut self, precondition: Precondition) -> Self {
        self.mutations.push(Mutation::Check(precondition));
        self
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mutation> {
        self.mutations.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}

/// Storage backend used by the engine.
///
/// Type names passed to a store are the canonical names from the catalog.
pub trait Store: Send + Sync {
    /// Type names the store keeps tables for
    fn registered_types(&self) -> Vec<String>;

    /// Whether the store holds records of `type_name`
    fn has_type(&self, type_name: &str) -> bool {
        self.registered_types().iter().any(|name| name == type_name)
    }

    fn find_by_id(&self, type_name: &str, id: RecordId) -> StoreResult<Option<Record>>;

    /// All records of a type, ordered by identity
    fn find_all(&self, type_name: &str) -> StoreResult<Vec<Record>>;

    /// Applies a batch atomically.
    ///
    /// Mutations run in order; a `Check` sees the effect of every mutation
    /// before it and fails the whole batch with
    /// [`StoreError::PreconditionFailed`] when it does not hold. Returns the identities assigned to `Persist` mutations, in batch order.
    fn apply(&self, batch: WriteBatch) -> StoreResult<Vec<RecordId>>;

    /// Inserts one record and returns its new identity.
    fn persist(&self, record: Record) -> StoreResult<RecordId> {
        let type_name = record.type_name().to_string();
        self.apply(WriteBatch::new().persist(record))?
            .into_iter()
            .next()
            .ok_or(StoreError::MissingIdentity(type_name))
    }

    fn merge(&self, record: Record) -> StoreResult<()> {
        self.apply(WriteBatch::new().merge(record)).map(|_| ())
    }

    fn remove(&self, key: RecordKey) -> StoreResult<()> {
        self.apply(WriteBatch::new().remove(key)).map(|_| ())
    }
}
