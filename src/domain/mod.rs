//! Built-in record types

mod traffic;

pub use traffic::{car, descriptors, driver, fine, traffic_catalog, PHONE_PATTERN};
