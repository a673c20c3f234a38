//! roadbook - a schema-driven registry of drivers, cars and traffic fines
//!
//! Record types are described by metadata ([`schema::TypeDescriptor`]) and
//! one generic [`engine::CrudEngine`] serves all of them: form text is
//! decoded and validated against the catalog, references are resolved
//! through the [`store::Store`] and deletes cascade to dependent records.

pub mod cli;
pub mod codec;
pub mod domain;
pub mod engine;
pub mod observability;
pub mod relation;
pub mod schema;
pub mod store;
