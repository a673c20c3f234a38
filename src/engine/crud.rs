//! CRUD orchestration over any registered type
//!
//! Every write follows the same order: resolve the descriptor, decode and
//! validate the whole form, check uniqueness against the store, and only
//! then send a single batch to the store. Nothing is written if any step
//! reports a problem.
//!
//! The batch repeats the reference and uniqueness checks as preconditions
//! the store evaluates under its write guard, so a write that raced another
//! one is refused with the same errors instead of being committed.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::errors::{EngineError, EngineResult, Rejection};
use super::response::Listing;
use crate::codec::{self, FieldMap, FieldValue, FormCodec, FormData, FormValues};
use crate::observability::Event;
use crate::relation::CascadePlanner;
use crate::schema::{
    MetadataCatalog, TypeDescriptor, ValidationError, ValidationResult, Validator,
};
use crate::store::{Precondition, Record, RecordId, RecordKey, Store, StoreError, WriteBatch};

/// Generic CRUD engine driven entirely by the metadata catalog.
pub struct CrudEngine<S: Store> {
    catalog: Arc<MetadataCatalog>,
    store: S,
}

impl<S: Store> CrudEngine<S> {
    /// Creates an engine; every catalog type must have a table in `store`.
    pub fn new(catalog: Arc<MetadataCatalog>, store: S) -> EngineResult<Self> {
        let registered = store.registered_types();
        if let Some(missing) = catalog
            .list_types()
            .into_iter()
            .find(|name| !registered.iter().any(|r| r == name))
        {
            return Err(EngineError::UnregisteredType(missing.to_string()));
        }

        Ok(Self { catalog, store })
    }

    pub fn catalog(&self) -> &MetadataCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn descriptor(&self, type_name: &str) -> EngineResult<&TypeDescriptor> {
        self.catalog
            .resolve(type_name)
            .ok_or_else(|| EngineError::UnknownType(type_name.to_string()))
    }

    fn fetch(&self, descriptor: &TypeDescriptor, id: RecordId) -> EngineResult<Record> {
        self.store
            .find_by_id(&descriptor.name, id)?
            .ok_or_else(|| EngineError::RecordNotFound {
                type_name: descriptor.name.clone(),
                id,
            })
    }

    fn codec(&self) -> FormCodec<'_, S> {
        FormCodec::new(&self.catalog, &self.store)
    }

    /// Names of all registered types, in registration order.
    pub fn list_types(&self) -> Vec<&str> {
        self.catalog.list_types()
    }

    /// Every record of a type as display rows, ordered by identity.
    pub fn list(&self, type_name: &str) -> EngineResult<Listing<'_>> {
        let descriptor = self.descriptor(type_name)?;
        let rows = self
            .store
            .find_all(&descriptor.name)?
            .iter()
            .map(|record| codec::encode(descriptor, record))
            .collect();

        Ok(Listing { descriptor, rows })
    }

    /// Field values of one record, ready to pre-fill an edit form.
    pub fn get(&self, type_name: &str, id: RecordId) -> EngineResult<FormValues> {
        let descriptor = self.descriptor(type_name)?;
        let record = self.fetch(descriptor, id)?;
        Ok(codec::form_values(descriptor, &record))
    }

    /// Creates a record from form data and returns its identity.
    pub fn create(&self, type_name: &str, form: &FormData) -> EngineResult<RecordId> {
        let descriptor = self.descriptor(type_name)?;
        let validator = Validator::new(&self.catalog);

        let decoded = self.codec().decode(descriptor, form, None)?;
        let mut errors = decoded.result;
        errors.merge(validator.validate_all(descriptor, &decoded.values));
        errors.merge(validator.validate_required(descriptor, &decoded.values, &decoded.failed));
        errors.merge(self.check_unique(descriptor, &decoded.values, None)?);

        if !errors.is_valid() {
            return Err(self.reject(descriptor, "create", errors, None));
        }

        let batch = self.guarded(descriptor, &decoded.values, None);
        let record = decoded
            .values
            .into_iter()
            .fold(Record::new(descriptor.name.clone()), |record, (field, value)| {
                record.with_value(field, value)
            });
        let id = self
            .store
            .apply(batch.persist(record))
            .map_err(|e| self.refused(descriptor, "create", e, None))?
            .first()
            .copied()
            .ok_or(StoreError::MissingIdentity(descriptor.name.clone()))?;

        info!(
            event = %Event::RecordCreated,
            type_name = %descriptor.name,
            id = %id,
            "record created"
        );
        Ok(id)
    }

    /// Applies form data to an existing record.
    ///
    /// Blank or missing keys leave their fields unchanged, so only the
    /// fields that actually change are validated and written.
    pub fn update(&self, type_name: &str, id: RecordId, form: &FormData) -> EngineResult<()> {
        let descriptor = self.descriptor(type_name)?;
        let existing = self.fetch(descriptor, id)?;
        let validator = Validator::new(&self.catalog);

        let decoded = self.codec().decode(descriptor, form, Some(&existing))?;
        let changed: FieldMap = decoded
            .values
            .into_iter()
            .filter(|(field, value)| existing.get(field) != Some(value))
            .collect();

        let mut errors = decoded.result;
        errors.merge(validator.validate_all(descriptor, &changed));
        errors.merge(self.check_unique(descriptor, &changed, Some(id))?);

        if !errors.is_valid() {
            let current = codec::form_values(descriptor, &existing);
            return Err(self.reject(descriptor, "update", errors, Some(current)));
        }

        if changed.is_empty() {
            debug!(
                event = %Event::UpdateUnchanged,
                type_name = %descriptor.name,
                id = %id,
                "update changed nothing"
            );
            return Ok(());
        }

        let fields: Vec<&str> = changed.keys().map(String::as_str).collect();
        let fields = fields.join(",");

        let batch = self.guarded(descriptor, &changed, Some(id));
        let current = codec::form_values(descriptor, &existing);
        let mut merged = existing;
        for (field, value) in changed {
            merged.set(field, value);
        }
        self.store
            .apply(batch.merge(merged))
            .map_err(|e| match e {
                StoreError::MissingRecord(_) => EngineError::RecordNotFound {
                    type_name: descriptor.name.clone(),
                    id,
                },
                e => self.refused(descriptor, "update", e, Some(current)),
            })?;

        info!(
            event = %Event::RecordUpdated,
            type_name = %descriptor.name,
            id = %id,
            fields = %fields,
            "record updated"
        );
        Ok(())
    }

    /// Deletes a record together with everything that depends on it.
    ///
    /// Records holding a mandatory reference to a deleted record are deleted
    /// too, transitively; nullable references are cleared. The whole cascade
    /// is applied as one batch. Returns the keys of all removed records,
    /// dependents first.
    pub fn delete(&self, type_name: &str, id: RecordId) -> EngineResult<Vec<RecordKey>> {
        let descriptor = self.descriptor(type_name)?;
        self.fetch(descriptor, id)?;

        let plan = CascadePlanner::new(&self.catalog, &self.store)
            .plan(RecordKey::new(descriptor.name.clone(), id))?;
        let removed = plan.removals.clone();
        let detached = plan.detachments.len();

        self.store
            .apply(plan.into_batch())
            .map_err(|e| match e {
                StoreError::MissingRecord(ref key)
                    if key.id == id && key.type_name == descriptor.name =>
                {
                    EngineError::RecordNotFound {
                        type_name: descriptor.name.clone(),
                        id,
                    }
                }
                StoreError::PreconditionFailed(_) | StoreError::MissingRecord(_) => {
                    warn!(
                        event = %Event::OperationRejected,
                        type_name = %descriptor.name,
                        operation = "delete",
                        "{}",
                        e
                    );
                    EngineError::Conflict(e.to_string())
                }
                e => e.into(),
            })?;

        info!(
            event = %Event::RecordsDeleted,
            type_name = %descriptor.name,
            id = %id,
            removed = removed.len(),
            detached,
            "records deleted"
        );
        Ok(removed)
    }

    /// Reports values of unique fields already held by another record.
    fn check_unique(
        &self,
        descriptor: &TypeDescriptor,
        values: &FieldMap,
        exclude: Option<RecordId>,
    ) -> EngineResult<ValidationResult> {
        let mut result = ValidationResult::new();

        let unique: Vec<_> = descriptor
            .data_fields()
            .filter(|field| field.unique)
            .filter_map(|field| values.get(&field.name).map(|value| (field, value)))
            .collect();
        if unique.is_empty() {
            return Ok(result);
        }

        let others: Vec<Record> = self
            .store
            .find_all(&descriptor.name)?
            .into_iter()
            .filter(|record| record.id() != exclude)
            .collect();

        for (field, value) in unique {
            if others.iter().any(|record| record.get(&field.name) == Some(value)) {
                result.push(ValidationError::unique_violation(
                    &field.name,
                    &value.to_string(),
                ));
            }
        }

        Ok(result)
    }

    /// Starts a batch with the checks the store repeats at commit: every
    /// reference in `values` still resolves and every unique value in it is
    /// still free.
    fn guarded(
        &self,
        descriptor: &TypeDescriptor,
        values: &FieldMap,
        except: Option<RecordId>,
    ) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for field in descriptor.data_fields() {
            let Some(value) = values.get(&field.name) else {
                continue;
            };

            if let (FieldValue::Reference(target_id), Some(target)) = (
                value,
                field.reference_type().and_then(|t| self.catalog.resolve(t)),
            ) {
                batch = batch.check(Precondition::Exists {
                    field: field.name.clone(),
                    key: RecordKey::new(target.name.clone(), *target_id),
                });
            }

            if field.unique {
                batch = batch.check(Precondition::Unique {
                    type_name: descriptor.name.clone(),
                    field: field.name.clone(),
                    value: value.clone(),
                    except,
                });
            }
        }
        batch
    }

    /// Maps a broken commit-time check back to the validation error the
    /// engine reports for it.
    fn refused(
        &self,
        descriptor: &TypeDescriptor,
        operation: &str,
        err: StoreError,
        current: Option<FormValues>,
    ) -> EngineError {
        let error = match err {
            StoreError::PreconditionFailed(Precondition::Exists { field, key }) => {
                ValidationError::reference_not_found(field, &key.type_name, key.id)
            }
            StoreError::PreconditionFailed(Precondition::Unique { field, value, .. }) => {
                ValidationError::unique_violation(field, &value.to_string())
            }
            err => return err.into(),
        };
        self.reject(descriptor, operation, error.into(), current)
    }

    fn reject(
        &self,
        descriptor: &TypeDescriptor,
        operation: &str,
        errors: ValidationResult,
        current: Option<FormValues>,
    ) -> EngineError {
        warn!(
            event = %Event::OperationRejected,
            type_name = %descriptor.name,
            operation,
            errors = errors.len(),
            "{}",
            errors
        );
        EngineError::Rejected(Rejection { errors, current })
    }
}
