//! Type and field descriptor definitions
//!
//! Supported field kinds:
//! - string: UTF-8 text, optionally bounded by `max_length` and `pattern`
//! - integer: 32-bit signed integer
//! - long: 64-bit signed integer
//! - double: 64-bit floating point
//! - decimal: exact base-10 number
//! - boolean: `true` / `false`
//! - date: calendar date (`YYYY-MM-DD`)
//! - timestamp: date and time of day (`YYYY-MM-DD HH:MM:SS`)
//! - enum: one symbol out of a declared set
//! - reference: identity of a record of another registered type

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Name of the identity field every descriptor must declare.
pub const IDENTITY_FIELD: &str = "id";

/// Field kinds a descriptor may declare
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldKind {
    /// UTF-8 string
    String,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// 64-bit floating point
    Double,
    /// Exact decimal number
    Decimal,
    /// Boolean
    Boolean,
    /// Calendar date without time zone
    Date,
    /// Date and time without time zone, second precision
    Timestamp,
    /// One of a fixed set of symbols
    Enum {
        /// Declared symbols in canonical spelling
        symbols: Vec<String>,
    },
    /// Identity of a record of another type
    Reference {
        /// Name of the referenced type
        target: String,
    },
}

impl FieldKind {
    /// Returns the kind name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Long => "long",
            FieldKind::Double => "double",
            FieldKind::Decimal => "decimal",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Enum { .. } => "enum",
            FieldKind::Reference { .. } => "reference",
        }
    }

    /// Whether a numeric range constraint applies to this kind
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Integer | FieldKind::Long | FieldKind::Double | FieldKind::Decimal
        )
    }

    /// Referenced type name, for reference kinds only
    pub fn reference_target(&self) -> Option<&str> {
        match self {
            FieldKind::Reference { target } => Some(target),
            _ => None,
        }
    }

    /// Declared symbols, for enum kinds only
    pub fn enum_symbols(&self) -> Option<&[String]> {
        match self {
            FieldKind::Enum { symbols } => Some(symbols),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Reference { target } => write!(f, "reference to {}", target),
            other => f.write_str(other.type_name()),
        }
    }
}

/// Inclusive numeric bounds; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    /// Whether `value` lies within the bounds
    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    /// Whether an integer lies within the bounds, compared exactly.
    ///
    /// Bounds are rounded inwards to whole numbers, so no `i64` is rounded
    /// onto a bound it actually exceeds.
    pub fn contains_integer(&self, value: i64) -> bool {
        let value = i128::from(value);
        self.min.map_or(true, |min| value >= min.ceil() as i128)
            && self.max.map_or(true, |max| value <= max.floor() as i128)
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "between {} and {}", min, max),
            (Some(min), None) => write!(f, "at least {}", min),
            (None, Some(max)) => write!(f, "at most {}", max),
            (None, None) => f.write_str("unbounded"),
        }
    }
}

/// Field definition with its constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name, unique within its type
    pub name: String,
    /// Field kind
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Whether the field may be left empty
    #[serde(default)]
    pub nullable: bool,
    /// Maximum length in characters (string fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Allowed numeric bounds (numeric fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<NumericRange>,
    /// Regular expression the whole value must match (string fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Whether values must be distinct across records of the type
    #[serde(default)]
    pub unique: bool,
}

impl FieldDescriptor {
    /// Create a required field of the given kind
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            max_length: None,
            range: None,
            pattern: None,
            unique: false,
        }
    }

    /// The identity field: a required long named `id`
    pub fn identity() -> Self {
        Self::new(IDENTITY_FIELD, FieldKind::Long)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn long(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Long)
    }

    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Double)
    }

    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Decimal)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        symbols: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            FieldKind::Enum {
                symbols: symbols.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Reference {
                target: target.into(),
            },
        )
    }

    /// Mark the field as optional
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn range(mut self, range: NumericRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Whether this is the identity field
    pub fn is_identity(&self) -> bool {
        self.name == IDENTITY_FIELD
    }

    /// Referenced type name, for reference fields only
    pub fn reference_type(&self) -> Option<&str> {
        self.kind.reference_target()
    }

    /// Validates constraints that only make sense for certain kinds
    fn validate_constraints(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Field name must not be blank".into());
        }

        if self.range.is_some() && !self.kind.is_numeric() {
            return Err(format!(
                "Field '{}': numeric range declared on {} field",
                self.name,
                self.kind.type_name()
            ));
        }

        if let Some(range) = &self.range {
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(format!(
                        "Field '{}': range minimum {} exceeds maximum {}",
                        self.name, min, max
                    ));
                }
            }
        }

        if self.max_length.is_some() && self.kind != FieldKind::String {
            return Err(format!(
                "Field '{}': max_length declared on {} field",
                self.name,
                self.kind.type_name()
            ));
        }

        if self.pattern.is_some() && self.kind != FieldKind::String {
            return Err(format!(
                "Field '{}': pattern declared on {} field",
                self.name,
                self.kind.type_name()
            ));
        }

        if let FieldKind::Enum { symbols } = &self.kind {
            if symbols.is_empty() {
                return Err(format!("Field '{}': enum declares no symbols", self.name));
            }
            let mut seen = HashSet::new();
            for symbol in symbols {
                if !seen.insert(symbol.to_lowercase()) {
                    return Err(format!(
                        "Field '{}': duplicate enum symbol '{}'",
                        self.name, symbol
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Complete record type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Type name as displayed (lookup is case-insensitive)
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field definitions in display order
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Create a new type descriptor
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Looks up a field by exact name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the identity field
    pub fn identity_field(&self) -> Option<&FieldDescriptor> {
        self.field(IDENTITY_FIELD)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Fields that reference other types
    pub fn reference_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.reference_type().is_some())
    }

    /// Fields the caller may supply (everything except the identity)
    pub fn data_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_identity())
    }

    /// Validates the descriptor structure itself (not a record)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Type name must not be blank".into());
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(format!("Duplicate field '{}'", field.name));
            }
            field.validate_constraints()?;
        }

        let id_field = self
            .identity_field()
            .ok_or_else(|| format!("Type must define an '{}' field", IDENTITY_FIELD))?;

        if id_field.kind != FieldKind::Long {
            return Err(format!(
                "'{}' field must be a long, found {}",
                IDENTITY_FIELD,
                id_field.kind.type_name()
            ));
        }

        if id_field.nullable {
            return Err(format!("'{}' field must not be nullable", IDENTITY_FIELD));
        }

        Ok(())
    }
}
