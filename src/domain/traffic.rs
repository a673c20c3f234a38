//! Traffic registry record types: drivers, their cars and traffic fines
//!
//! Reference graph:
//! - `Car.driver` -> `Driver` (mandatory)
//! - `Fine.car` -> `Car` (mandatory)
//! - `Fine.driver` -> `Driver` (mandatory)
//!
//! Deleting a driver therefore removes the driver's cars and fines;
//! deleting a car removes its fines.

use crate::schema::{
    FieldDescriptor, MetadataCatalog, NumericRange, SchemaResult, TypeDescriptor,
};

/// Accepted phone number shape: optional `+`, then digits, spaces, dashes
/// and parentheses.
pub const PHONE_PATTERN: &str = r"^[+]?[0-9\s\-()]+$";

pub fn driver() -> TypeDescriptor {
    TypeDescriptor::new(
        "Driver",
        vec![
            FieldDescriptor::identity(),
            FieldDescriptor::string("name").max_length(100),
            FieldDescriptor::string("licenseNumber")
                .max_length(15)
                .unique(),
            FieldDescriptor::date("birthDate"),
            FieldDescriptor::string("phoneNumber")
                .nullable()
                .max_length(15)
                .pattern(PHONE_PATTERN),
            FieldDescriptor::string("address").nullable().max_length(255),
        ],
    )
    .with_description("Licensed driver")
}

pub fn car() -> TypeDescriptor {
    TypeDescriptor::new(
        "Car",
        vec![
            FieldDescriptor::identity(),
            FieldDescriptor::string("country").max_length(50),
            FieldDescriptor::string("model").max_length(50),
            FieldDescriptor::string("licensePlate")
                .max_length(15)
                .unique(),
            FieldDescriptor::integer("year").range(NumericRange::between(1900.0, 2030.0)),
            FieldDescriptor::reference("driver", "Driver"),
        ],
    )
    .with_description("Registered vehicle and its owner")
}

pub fn fine() -> TypeDescriptor {
    TypeDescriptor::new(
        "Fine",
        vec![
            FieldDescriptor::identity(),
            FieldDescriptor::date("issueDate"),
            FieldDescriptor::string("violation").max_length(255),
            FieldDescriptor::integer("amount").range(NumericRange::at_least(1.0)),
            FieldDescriptor::reference("car", "Car"),
            FieldDescriptor::reference("driver", "Driver"),
        ],
    )
    .with_description("Traffic fine issued for a car and its driver")
}

/// The built-in descriptors, in registration order.
pub fn descriptors() -> Vec<TypeDescriptor> {
    vec![driver(), car(), fine()]
}

/// Catalog of the built-in traffic types.
pub fn traffic_catalog() -> SchemaResult<MetadataCatalog> {
    MetadataCatalog::build(descriptors())
}
