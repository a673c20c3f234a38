//! Reference field resolution

use thiserror::Error;

use crate::codec::scalar;
use crate::schema::{FieldDescriptor, MetadataCatalog, ValidationError};
use crate::store::{Record, Store, StoreError};

/// Why a reference could not be resolved
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The raw value is malformed or names a missing record
    #[error("{0}")]
    Invalid(ValidationError),
    /// The store failed while looking the record up
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Turns the raw text of a reference field into the referenced record.
///
/// Resolution only reads from the store.
pub struct RelationResolver<'a, S: Store + ?Sized> {
    catalog: &'a MetadataCatalog,
    store: &'a S,
}

impl<'a, S: Store + ?Sized> RelationResolver<'a, S> {
    pub fn new(catalog: &'a MetadataCatalog, store: &'a S) -> Self {
        Self { catalog, store }
    }

    /// Resolves `raw` to an existing record of the field's target type.
    pub fn resolve(&self, field: &FieldDescriptor, raw: &str) -> Result<Record, ResolveError> {
        let declared = field.reference_type().ok_or_else(|| {
            ResolveError::Invalid(ValidationError::type_mismatch(
                &field.name,
                field.kind.type_name(),
                raw,
            ))
        })?;

        // Targets are checked when the catalog is built
        let target = self
            .catalog
            .resolve(declared)
            .map(|descriptor| descriptor.name.as_str())
            .unwrap_or(declared);

        let id = scalar::parse_identity(raw).ok_or_else(|| {
            ResolveError::Invalid(ValidationError::type_mismatch(
                &field.name,
                &scalar::expected(&field.kind),
                raw,
            ))
        })?;

        self.store.find_by_id(target, id)?.ok_or_else(|| {
            ResolveError::Invalid(ValidationError::reference_not_found(&field.name, target, id))
        })
    }
}
