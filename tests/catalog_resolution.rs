//! Catalog Resolution Tests
//!
//! - Type lookup ignores case
//! - Registration order is preserved
//! - Descriptors round-trip through a descriptor directory
//! - The engine serves any catalog, not only the built-in types

use std::fs;
use std::sync::Arc;

use roadbook::codec::FormData;
use roadbook::domain;
use roadbook::engine::CrudEngine;
use roadbook::schema::{
    ErrorKind, FieldDescriptor, MetadataCatalog, NumericRange, SchemaErrorCode, TypeDescriptor,
};
use roadbook::store::MemoryStore;
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn form(pairs: &[(&str, &str)]) -> FormData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn inspection() -> TypeDescriptor {
    TypeDescriptor::new(
        "Inspection",
        vec![
            FieldDescriptor::identity(),
            FieldDescriptor::timestamp("performedAt"),
            FieldDescriptor::enumeration("result", ["Passed", "Failed"]),
            FieldDescriptor::decimal("fee").range(NumericRange::at_least(0.0)),
            FieldDescriptor::boolean("repeat").nullable(),
            FieldDescriptor::reference("car", "Car"),
        ],
    )
}

// =============================================================================
// Resolution Tests
// =============================================================================

#[test]
fn test_resolution_ignores_case() {
    let catalog = domain::traffic_catalog().unwrap();

    let lower = catalog.resolve("car").unwrap();
    let title = catalog.resolve("Car").unwrap();
    let upper = catalog.resolve("CAR").unwrap();

    assert_eq!(lower, title);
    assert_eq!(title, upper);
    assert_eq!(upper.name, "Car");
    assert!(catalog.resolve("cars").is_none());
}

#[test]
fn test_types_listed_in_registration_order() {
    let catalog = domain::traffic_catalog().unwrap();
    assert_eq!(catalog.list_types(), vec!["Driver", "Car", "Fine"]);
}

#[test]
fn test_type_names_differing_only_in_case_collide() {
    let result = MetadataCatalog::build(vec![
        TypeDescriptor::new("Car", vec![FieldDescriptor::identity()]),
        TypeDescriptor::new("CAR", vec![FieldDescriptor::identity()]),
    ]);
    assert_eq!(result.unwrap_err().code(), SchemaErrorCode::DuplicateType);
}

#[test]
fn test_dangling_reference_rejected() {
    let result = MetadataCatalog::build(vec![inspection()]);
    assert_eq!(
        result.unwrap_err().code(),
        SchemaErrorCode::UnknownReferenceTarget
    );
}

// =============================================================================
// Descriptor Directory Tests
// =============================================================================

#[test]
fn test_descriptor_directory_round_trip() {
    let tmp = TempDir::new().unwrap();

    for descriptor in domain::descriptors() {
        MetadataCatalog::save_descriptor(tmp.path(), &descriptor).unwrap();
    }
    fs::write(tmp.path().join("README.txt"), "not a descriptor").unwrap();

    let loaded = MetadataCatalog::from_dir(tmp.path()).unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.resolve("driver"), Some(&domain::driver()));
    assert_eq!(loaded.resolve("fine"), Some(&domain::fine()));
    assert!(loaded.pattern("Driver", "phoneNumber").is_some());
}

#[test]
fn test_malformed_descriptor_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("truck.json"),
        json!({ "name": "Truck", "fields": [{ "name": "plate", "kind": "string" }] }).to_string(),
    )
    .unwrap();

    let err = MetadataCatalog::from_dir(tmp.path()).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::MalformedDescriptor);
}

// =============================================================================
// Generic Engine Tests
// =============================================================================

/// A type the built-in domain knows nothing about goes through the same engine.
#[test]
fn test_engine_serves_custom_type() {
    let mut descriptors = domain::descriptors();
    descriptors.push(inspection());
    let catalog = Arc::new(MetadataCatalog::build(descriptors).unwrap());
    let store = MemoryStore::for_catalog(&catalog);
    let engine = CrudEngine::new(catalog, store).unwrap();

    let driver = engine
        .create(
            "driver",
            &form(&[
                ("name", "Oleg"),
                ("licenseNumber", "EF1112223"),
                ("birthDate", "1970-06-15"),
            ]),
        )
        .unwrap();
    let car = engine
        .create(
            "car",
            &form(&[
                ("country", "KZ"),
                ("model", "Moskvich"),
                ("licensePlate", "K777KK"),
                ("year", "1977"),
                ("driver", driver.to_string().as_str()),
            ]),
        )
        .unwrap();

    let id = engine
        .create(
            "inspection",
            &form(&[
                ("performedAt", "2024-03-01 09:30:00"),
                ("result", "passed"),
                ("fee", "1500.00"),
                ("car", car.to_string().as_str()),
            ]),
        )
        .unwrap();

    let values = engine.get("Inspection", id).unwrap();
    assert_eq!(values["result"], "Passed");
    assert_eq!(values["fee"], "1500.00");
    assert_eq!(values["repeat"], "");

    let err = engine
        .update("Inspection", id, &form(&[("fee", "-1"), ("result", "Maybe")]))
        .unwrap_err();
    let errors = err.validation().unwrap();
    assert!(errors.contains_kind(ErrorKind::RangeViolation));
    assert!(errors.contains_kind(ErrorKind::TypeMismatch));

    // Deleting the car takes the inspection with it
    let removed = engine.delete("Car", car).unwrap();
    assert_eq!(removed.len(), 2);
}
