//! Typed field values

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::FieldKind;
use crate::store::RecordId;

/// A decoded, typed field value.
///
/// Each variant corresponds to exactly one [`FieldKind`]; references hold
/// only the identity of the target record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    String(String),
    Integer(i32),
    Long(i64),
    Double(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Enum(String),
    Reference(RecordId),
}

impl FieldValue {
    /// Kind name matching [`FieldKind::type_name`]
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Integer(_) => "integer",
            FieldValue::Long(_) => "long",
            FieldValue::Double(_) => "double",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Date(_) => "date",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Enum(_) => "enum",
            FieldValue::Reference(_) => "reference",
        }
    }

    /// Whether this value is of the given field kind
    pub fn matches_kind(&self, kind: &FieldKind) -> bool {
        self.type_name() == kind.type_name()
    }

    /// Numeric view used for range checks
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(f64::from(*v)),
            FieldValue::Long(v) => Some(*v as f64),
            FieldValue::Double(v) => Some(*v),
            FieldValue::Decimal(v) => v.to_f64(),
            _ => None,
        }
    }

    /// Text of string and enum values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) | FieldValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<RecordId> {
        match self {
            FieldValue::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

/// Canonical text form, as produced by the form encoder
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) | FieldValue::Enum(s) => f.write_str(s),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Decimal(v) => write!(f, "{}", v),
            FieldValue::Boolean(v) => write!(f, "{}", v),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            FieldValue::Reference(id) => write!(f, "{}", id),
        }
    }
}
