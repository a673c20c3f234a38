//! CRUD engine
//!
//! [`CrudEngine`] composes the catalog, the form codec, the validator and
//! the relation helpers on top of a [`Store`](crate::store::Store). It keeps
//! no mutable state of its own.

mod crud;
mod errors;
mod response;

pub use crud::CrudEngine;
pub use errors::{EngineError, EngineResult, Rejection};
pub use response::Listing;
