//! Conversion between form text and typed field values
//!
//! - [`FieldValue`]: a typed value of one field kind
//! - [`scalar`]: the strict text grammar per kind
//! - [`FormCodec`]: whole-form decoding and record encoding

mod form;
pub mod scalar;
mod value;

pub use form::{encode, form_values, Decoded, FieldMap, FormCodec, FormData, FormValues, Row};
pub use value::FieldValue;
