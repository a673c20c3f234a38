//! Metadata subsystem for roadbook
//!
//! Every record type is described by a [`TypeDescriptor`]: its fields,
//! their kinds and their constraints. Descriptors are registered once in a
//! [`MetadataCatalog`] and drive decoding, validation and relation handling
//! for all types alike.
//!
//! # Design Principles
//!
//! - Descriptors are fixed after the catalog is built
//! - Type lookup is case-insensitive
//! - Validation problems are collected, never thrown one by one

mod catalog;
mod errors;
mod types;
mod validator;

pub use catalog::MetadataCatalog;
pub use errors::{
    ErrorKind, SchemaError, SchemaErrorCode, SchemaResult, ValidationError, ValidationResult,
};
pub use types::{FieldDescriptor, FieldKind, NumericRange, TypeDescriptor, IDENTITY_FIELD};
pub use validator::Validator;
