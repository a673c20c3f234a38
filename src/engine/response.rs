//! Operation results handed back to callers

use serde::Serialize;

use crate::codec::Row;
use crate::schema::TypeDescriptor;

/// Every record of one type, encoded for display.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<'a> {
    pub descriptor: &'a TypeDescriptor,
    pub rows: Vec<Row>,
}

impl<'a> Listing<'a> {
    /// Column headers, in row order
    pub fn headers(&self) -> Vec<&str> {
        self.descriptor.field_names().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
