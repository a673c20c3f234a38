//! Relations between record types
//!
//! - [`RelationResolver`]: reference field text to the referenced record
//! - [`CascadePlanner`]: the set of records a delete must touch

mod cascade;
mod resolver;

pub use cascade::{CascadePlan, CascadePlanner};
pub use resolver::{RelationResolver, ResolveError};
