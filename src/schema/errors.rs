//! Schema and validation error types
//!
//! Descriptor errors (fatal at startup):
//! - ROADBOOK_MALFORMED_DESCRIPTOR
//! - ROADBOOK_DUPLICATE_TYPE
//! - ROADBOOK_UNKNOWN_REFERENCE_TARGET
//! - ROADBOOK_DESCRIPTOR_IO
//!
//! Validation errors are never raised one at a time; they are collected
//! into a [`ValidationResult`] so every problem can be reported together.

use serde::Serialize;
use std::fmt;

/// Descriptor error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Descriptor violates a structural rule
    MalformedDescriptor,
    /// Two descriptors share a name (case-insensitively)
    DuplicateType,
    /// Reference field targets a type that is not registered
    UnknownReferenceTarget,
    /// Descriptor file could not be read or written
    DescriptorIo,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::MalformedDescriptor => "ROADBOOK_MALFORMED_DESCRIPTOR",
            SchemaErrorCode::DuplicateType => "ROADBOOK_DUPLICATE_TYPE",
            SchemaErrorCode::UnknownReferenceTarget => "ROADBOOK_UNKNOWN_REFERENCE_TARGET",
            SchemaErrorCode::DescriptorIo => "ROADBOOK_DESCRIPTOR_IO",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Descriptor error with context
#[derive(Debug)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    type_name: Option<String>,
}

impl SchemaError {
    /// Create a malformed descriptor error
    pub fn malformed(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let name = type_name.into();
        Self {
            code: SchemaErrorCode::MalformedDescriptor,
            message: format!("Malformed descriptor '{}': {}", name, reason.into()),
            type_name: Some(name),
        }
    }

    /// Create a duplicate type error
    pub fn duplicate_type(type_name: impl Into<String>) -> Self {
        let name = type_name.into();
        Self {
            code: SchemaErrorCode::DuplicateType,
            message: format!("Type '{}' is registered more than once", name),
            type_name: Some(name),
        }
    }

    /// Create an unknown reference target error
    pub fn unknown_reference_target(
        type_name: impl Into<String>,
        field: &str,
        target: &str,
    ) -> Self {
        let name = type_name.into();
        Self {
            code: SchemaErrorCode::UnknownReferenceTarget,
            message: format!(
                "Field '{}.{}' references unregistered type '{}'",
                name, field, target
            ),
            type_name: Some(name),
        }
    }

    /// Create an error for an unreadable or unparsable descriptor file
    pub fn descriptor_io(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::DescriptorIo,
            message: format!("Descriptor file '{}': {}", path.into(), reason.into()),
            type_name: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the type name if applicable
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Error kinds reported by the engine
///
/// `UnknownType` and `RecordNotFound` are structural and end an operation
/// immediately; every other kind is a validation problem and is aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UnknownType,
    UnknownField,
    TypeMismatch,
    MissingRequiredValue,
    LengthExceeded,
    RangeViolation,
    ReferenceNotFound,
    RecordNotFound,
    PatternMismatch,
    UniqueViolation,
    ImmutableField,
}

impl ErrorKind {
    /// Returns the machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnknownType => "ROADBOOK_UNKNOWN_TYPE",
            ErrorKind::UnknownField => "ROADBOOK_UNKNOWN_FIELD",
            ErrorKind::TypeMismatch => "ROADBOOK_TYPE_MISMATCH",
            ErrorKind::MissingRequiredValue => "ROADBOOK_MISSING_REQUIRED_VALUE",
            ErrorKind::LengthExceeded => "ROADBOOK_LENGTH_EXCEEDED",
            ErrorKind::RangeViolation => "ROADBOOK_RANGE_VIOLATION",
            ErrorKind::ReferenceNotFound => "ROADBOOK_REFERENCE_NOT_FOUND",
            ErrorKind::RecordNotFound => "ROADBOOK_RECORD_NOT_FOUND",
            ErrorKind::PatternMismatch => "ROADBOOK_PATTERN_MISMATCH",
            ErrorKind::UniqueViolation => "ROADBOOK_UNIQUE_VIOLATION",
            ErrorKind::ImmutableField => "ROADBOOK_IMMUTABLE_FIELD",
        }
    }

    /// Whether the kind ends an operation on its own instead of being aggregated
    pub fn is_structural(&self) -> bool {
        matches!(self, ErrorKind::UnknownType | ErrorKind::RecordNotFound)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Field the problem was found on
    pub field: String,
    /// Problem category
    pub kind: ErrorKind,
    /// Human-readable explanation
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_field(field: impl Into<String>, type_name: &str) -> Self {
        let field = field.into();
        let message = format!("Field '{}' does not exist in {}", field, type_name);
        Self::new(field, ErrorKind::UnknownField, message)
    }

    pub fn type_mismatch(field: impl Into<String>, expected: &str, actual: &str) -> Self {
        let field = field.into();
        let message = format!(
            "Field '{}': expected {}, got '{}'",
            field, expected, actual
        );
        Self::new(field, ErrorKind::TypeMismatch, message)
    }

    pub fn missing_required(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("Field '{}' is required", field);
        Self::new(field, ErrorKind::MissingRequiredValue, message)
    }

    pub fn length_exceeded(field: impl Into<String>, max: usize, actual: usize) -> Self {
        let field = field.into();
        let message = format!(
            "Field '{}' must not exceed {} characters, got {}",
            field, max, actual
        );
        Self::new(field, ErrorKind::LengthExceeded, message)
    }

    pub fn range_violation(field: impl Into<String>, range: impl fmt::Display, actual: &str) -> Self {
        let field = field.into();
        let message = format!("Field '{}' must be {}, got {}", field, range, actual);
        Self::new(field, ErrorKind::RangeViolation, message)
    }

    pub fn reference_not_found(field: impl Into<String>, target: &str, id: impl fmt::Display) -> Self {
        let field = field.into();
        let message = format!(
            "Field '{}': {} with id {} does not exist",
            field, target, id
        );
        Self::new(field, ErrorKind::ReferenceNotFound, message)
    }

    pub fn pattern_mismatch(field: impl Into<String>, pattern: &str) -> Self {
        let field = field.into();
        let message = format!("Field '{}' does not match pattern {}", field, pattern);
        Self::new(field, ErrorKind::PatternMismatch, message)
    }

    pub fn unique_violation(field: impl Into<String>, value: &str) -> Self {
        let field = field.into();
        let message = format!("Field '{}': value '{}' is already taken", field, value);
        Self::new(field, ErrorKind::UniqueViolation, message)
    }

    pub fn immutable_field(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("Field '{}' cannot be set by the caller", field);
        Self::new(field, ErrorKind::ImmutableField, message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.code(), self.message)
    }
}

/// Ordered collection of validation failures; empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no errors were recorded
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Appends all errors of `other`, preserving order
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Errors recorded against `field`
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors.iter().filter(move |e| e.field == field)
    }

    /// Whether any error was recorded against `field`
    pub fn has_errors_for(&self, field: &str) -> bool {
        self.errors_for(field).next().is_some()
    }

    /// Whether any error of `kind` was recorded
    pub fn contains_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl From<ValidationError> for ValidationResult {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl FromIterator<ValidationError> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationResult {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorKind::TypeMismatch.code(), "ROADBOOK_TYPE_MISMATCH");
        assert_eq!(ErrorKind::ReferenceNotFound.code(), "ROADBOOK_REFERENCE_NOT_FOUND");
        assert_eq!(
            SchemaErrorCode::DuplicateType.code(),
            "ROADBOOK_DUPLICATE_TYPE"
        );
    }

    #[test]
    fn test_structural_kinds() {
        assert!(ErrorKind::UnknownType.is_structural());
        assert!(ErrorKind::RecordNotFound.is_structural());
        assert!(!ErrorKind::RangeViolation.is_structural());
        assert!(!ErrorKind::UnknownField.is_structural());
    }

    #[test]
    fn test_result_aggregates_in_order() {
        let mut result = ValidationResult::new();
        assert!(result.is_valid());

        result.push(ValidationError::missing_required("country"));
        result.push(ValidationError::length_exceeded("model", 50, 51));
        result.merge(ValidationError::unknown_field("colour", "Car").into());

        assert_eq!(result.len(), 3);
        let fields: Vec<_> = result.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["country", "model", "colour"]);
        assert!(result.has_errors_for("model"));
        assert!(result.contains_kind(ErrorKind::UnknownField));
        assert!(!result.contains_kind(ErrorKind::RangeViolation));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::type_mismatch("year", "integer", "abc");
        let display = err.to_string();
        assert!(display.contains("ROADBOOK_TYPE_MISMATCH"));
        assert!(display.contains("year"));
        assert!(display.contains("abc"));
    }

    #[test]
    fn test_result_serializes_as_list() {
        let result: ValidationResult =
            vec![ValidationError::missing_required("driver")].into_iter().collect();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json[0]["field"], "driver");
        assert_eq!(json[0]["kind"], "MissingRequiredValue");
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::unknown_reference_target("Fine", "car", "Vehicle");
        let display = err.to_string();
        assert!(display.starts_with("ROADBOOK_UNKNOWN_REFERENCE_TARGET"));
        assert!(display.contains("Fine.car"));
        assert_eq!(err.type_name(), Some("Fine"));
    }
}
