//! Form data decoding and record encoding
//!
//! Form data is a flat map of field name to raw text. Decoding turns it into
//! typed values for one descriptor, collecting every problem on the way;
//! encoding turns a stored record back into display text.
//!
//! A blank or whitespace-only value means "not supplied": it is skipped
//! without error, which leaves the current value alone on update.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::scalar;
use super::value::FieldValue;
use crate::relation::{RelationResolver, ResolveError};
use crate::schema::{
    FieldDescriptor, FieldKind, MetadataCatalog, TypeDescriptor, ValidationError, ValidationResult,
};
use crate::store::{Record, Store, StoreResult};

/// Raw form input: field name to text
pub type FormData = BTreeMap<String, String>;

/// Display text of every field, shaped like [`FormData`]
pub type FormValues = BTreeMap<String, String>;

/// Decoded values by field name
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Display values of one record, in descriptor field order.
///
/// `None` marks a field without a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row(Vec<Option<String>>);

impl Row {
    pub fn values(&self) -> &[Option<String>] {
        &self.0
    }

    /// Display value at `index`, if the field has one
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of decoding one form
#[derive(Debug, Default)]
pub struct Decoded {
    /// Successfully decoded values
    pub values: FieldMap,
    /// Fields that were supplied but failed to decode
    pub failed: BTreeSet<String>,
    /// Every decode problem, in descriptor field order
    pub result: ValidationResult,
}

/// Converts between form data and typed values for any descriptor.
pub struct FormCodec<'a, S: Store + ?Sized> {
    resolver: RelationResolver<'a, S>,
}

impl<'a, S: Store + ?Sized> FormCodec<'a, S> {
    pub fn new(catalog: &'a MetadataCatalog, store: &'a S) -> Self {
        Self {
            resolver: RelationResolver::new(catalog, store),
        }
    }

    /// Decodes `form` against `descriptor`.
    ///
    /// `existing` is the stored record on update and `None` on create; it
    /// only matters for the identity field, which callers may echo back
    /// unchanged but never set.
    ///
    /// Validation problems land in [`Decoded::result`]; only a failing
    /// store is an `Err`.
    pub fn decode(
        &self,
        descriptor: &TypeDescriptor,
        form: &FormData,
        existing: Option<&Record>,
    ) -> StoreResult<Decoded> {
        let mut decoded = Decoded::default();

        for field in &descriptor.fields {
            let Some(raw) = form.get(&field.name) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }

            match self.decode_field(field, raw, existing)? {
                Ok(Some(value)) => {
                    decoded.values.insert(field.name.clone(), value);
                }
                Ok(None) => {}
                Err(error) => {
                    decoded.failed.insert(field.name.clone());
                    decoded.result.push(error);
                }
            }
        }

        for key in form.keys() {
            if descriptor.field(key).is_none() {
                decoded
                    .result
                    .push(ValidationError::unknown_field(key.as_str(), &descriptor.name));
            }
        }

        debug!(
            type_name = %descriptor.name,
            decoded = decoded.values.len(),
            errors = decoded.result.len(),
            "form decoded"
        );

        Ok(decoded)
    }

    /// Decodes one non-blank value; `Ok(None)` means nothing to set.
    fn decode_field(
        &self,
        field: &FieldDescriptor,
        raw: &str,
        existing: Option<&Record>,
    ) -> StoreResult<Result<Option<FieldValue>, ValidationError>> {
        if field.is_identity() {
            let current = existing.and_then(Record::id);
            let echoed = scalar::parse_identity(raw);
            return Ok(match (current, echoed) {
                (Some(current), Some(echoed)) if current == echoed => Ok(None),
                _ => Err(ValidationError::immutable_field(&field.name)),
            });
        }

        if let FieldKind::Reference { .. } = field.kind {
            return match self.resolver.resolve(field, raw) {
                Ok(record) => Ok(Ok(record.id().map(FieldValue::Reference))),
                Err(ResolveError::Invalid(error)) => Ok(Err(error)),
                Err(ResolveError::Store(error)) => Err(error),
            };
        }

        Ok(scalar::parse(&field.kind, raw).map(Some).ok_or_else(|| {
            ValidationError::type_mismatch(&field.name, &scalar::expected(&field.kind), raw)
        }))
    }

    /// Encodes a record for display.
    pub fn encode(&self, descriptor: &TypeDescriptor, record: &Record) -> Row {
        encode(descriptor, record)
    }
}

/// Display value of one field of a record
fn display(field: &FieldDescriptor, record: &Record) -> Option<String> {
    if field.is_identity() {
        record.id().map(|id| id.to_string())
    } else {
        record.get(&field.name).map(scalar::format)
    }
}

/// Encodes a record as one display value per descriptor field, in order.
pub fn encode(descriptor: &TypeDescriptor, record: &Record) -> Row {
    Row(descriptor
        .fields
        .iter()
        .map(|field| display(field, record))
        .collect())
}

/// Encodes a record as form values; fields without a value map to `""`.
///
/// Posting the result back as an update changes nothing.
pub fn form_values(descriptor: &TypeDescriptor, record: &Record) -> FormValues {
    descriptor
        .fields
        .iter()
        .map(|field| (field.name.clone(), display(field, record).unwrap_or_default()))
        .collect()
}
