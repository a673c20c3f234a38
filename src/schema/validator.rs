//! Field constraint validation
//!
//! Checks performed on decoded values:
//! - string length against `max_length` (in characters)
//! - numeric value against `range` (inclusive)
//! - string value against `pattern` (whole value)
//! - enum value is a declared symbol
//! - required fields are present (create only)
//!
//! The validator never mutates values and never stops at the first
//! problem; every failure is returned in the result.

use std::collections::{BTreeMap, BTreeSet};

use super::catalog::MetadataCatalog;
use super::errors::{ValidationError, ValidationResult};
use super::types::{FieldDescriptor, FieldKind, TypeDescriptor};
use crate::codec::FieldValue;

/// Validator backed by the catalog it checks against.
pub struct Validator<'a> {
    catalog: &'a MetadataCatalog,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a MetadataCatalog) -> Self {
        Self { catalog }
    }

    /// Validates one decoded value against its field's constraints.
    pub fn validate(
        &self,
        descriptor: &TypeDescriptor,
        field: &FieldDescriptor,
        value: &FieldValue,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !value.matches_kind(&field.kind) {
            result.push(ValidationError::type_mismatch(
                &field.name,
                field.kind.type_name(),
                &value.to_string(),
            ));
            return result;
        }

        if let FieldValue::String(text) = value {
            if let Some(max) = field.max_length {
                let length = text.chars().count();
                if length > max {
                    result.push(ValidationError::length_exceeded(&field.name, max, length));
                }
            }

            if let (Some(pattern), Some(regex)) = (
                &field.pattern,
                self.catalog.pattern(&descriptor.name, &field.name),
            ) {
                if !regex.is_match(text) {
                    result.push(ValidationError::pattern_mismatch(&field.name, pattern));
                }
            }
        }

        if let Some(range) = &field.range {
            let within = match value {
                FieldValue::Integer(v) => Some(range.contains_integer(i64::from(*v))),
                FieldValue::Long(v) => Some(range.contains_integer(*v)),
                other => other.as_f64().map(|number| range.contains(number)),
            };
            if within == Some(false) {
                result.push(ValidationError::range_violation(
                    &field.name,
                    range,
                    &value.to_string(),
                ));
            }
        }

        if let (FieldKind::Enum { symbols }, FieldValue::Enum(symbol)) = (&field.kind, value) {
            if !symbols.contains(symbol) {
                result.push(ValidationError::type_mismatch(
                    &field.name,
                    &format!("one of {}", symbols.join(", ")),
                    symbol,
                ));
            }
        }

        result
    }

    /// Validates every value in `values` that names a field of `descriptor`.
    pub fn validate_all(
        &self,
        descriptor: &TypeDescriptor,
        values: &BTreeMap<String, FieldValue>,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();
        for field in &descriptor.fields {
            if let Some(value) = values.get(&field.name) {
                result.merge(self.validate(descriptor, field, value));
            }
        }
        result
    }

    /// Reports every required field that has no value.
    ///
    /// Fields in `attempted` were supplied but failed to decode; they already
    /// carry an error and are not reported twice.
    pub fn validate_required(
        &self,
        descriptor: &TypeDescriptor,
        values: &BTreeMap<String, FieldValue>,
        attempted: &BTreeSet<String>,
    ) -> ValidationResult {
        descriptor
            .data_fields()
            .filter(|field| !field.nullable)
            .filter(|field| !values.contains_key(&field.name) && !attempted.contains(&field.name))
            .map(|field| ValidationError::missing_required(&field.name))
            .collect()
    }
}
