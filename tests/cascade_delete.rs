//! Cascade Delete Tests
//!
//! Deleting a record removes every record holding a mandatory reference to
//! it, transitively, in one atomic batch:
//! - Driver -> its cars and fines (directly and through its cars)
//! - Car -> its fines
//! - Unrelated records survive

use std::sync::Arc;

use roadbook::codec::FormData;
use roadbook::domain;
use roadbook::engine::CrudEngine;
use roadbook::store::{MemoryStore, RecordId, RecordKey, Store};

// =============================================================================
// Helper Functions
// =============================================================================

struct Registry {
    engine: CrudEngine<MemoryStore>,
    licenses: usize,
}

impl Registry {
    fn new() -> Self {
        let catalog = Arc::new(domain::traffic_catalog().unwrap());
        let store = MemoryStore::for_catalog(&catalog);
        Self {
            engine: CrudEngine::new(catalog, store).unwrap(),
            licenses: 0,
        }
    }

    fn next_license(&mut self) -> String {
        self.licenses += 1;
        format!("X{:06}", self.licenses)
    }

    fn driver(&mut self) -> RecordId {
        let license = self.next_license();
        self.engine
            .create(
                "Driver",
                &form(&[
                    ("name", "Driver"),
                    ("licenseNumber", license.as_str()),
                    ("birthDate", "1975-11-30"),
                ]),
            )
            .unwrap()
    }

    fn car(&mut self, driver: RecordId) -> RecordId {
        let plate = self.next_license();
        self.engine
            .create(
                "Car",
                &form(&[
                    ("country", "RU"),
                    ("model", "Volga"),
                    ("licensePlate", plate.as_str()),
                    ("year", "1985"),
                    ("driver", driver.to_string().as_str()),
                ]),
            )
            .unwrap()
    }

    fn fine(&mut self, car: RecordId, driver: RecordId) -> RecordId {
        self.engine
            .create(
                "Fine",
                &form(&[
                    ("issueDate", "2024-02-29"),
                    ("violation", "Red light"),
                    ("amount", "1000"),
                    ("car", car.to_string().as_str()),
                    ("driver", driver.to_string().as_str()),
                ]),
            )
            .unwrap()
    }

    fn count(&self, type_name: &str) -> usize {
        self.engine.store().count(type_name).unwrap()
    }

    fn exists(&self, type_name: &str, id: RecordId) -> bool {
        self.engine
            .store()
            .find_by_id(type_name, id)
            .unwrap()
            .is_some()
    }
}

fn form(pairs: &[(&str, &str)]) -> FormData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// =============================================================================
// Cascade Completeness Tests
// =============================================================================

/// Driver with a car, a fine on that car and a direct fine: all four go.
#[test]
fn test_driver_delete_removes_cars_and_fines() {
    let mut registry = Registry::new();

    let driver = registry.driver();
    let car = registry.car(driver);
    let car_fine = registry.fine(car, driver);
    let other_driver = registry.driver();
    let other_car = registry.car(other_driver);
    // Fine on another driver's car, issued to the deleted driver
    let direct_fine = registry.fine(other_car, driver);
    let untouched_fine = registry.fine(other_car, other_driver);

    let removed = registry.engine.delete("Driver", driver).unwrap();

    assert_eq!(removed.len(), 4);
    assert!(removed.contains(&RecordKey::new("Driver", driver)));
    assert!(removed.contains(&RecordKey::new("Car", car)));
    assert!(removed.contains(&RecordKey::new("Fine", car_fine)));
    assert!(removed.contains(&RecordKey::new("Fine", direct_fine)));

    assert!(registry.exists("Driver", other_driver));
    assert!(registry.exists("Car", other_car));
    assert!(registry.exists("Fine", untouched_fine));
    assert_eq!(registry.count("Fine"), 1);
}

/// N cars and M fines of one driver: exactly N + M + 1 records removed.
#[test]
fn test_cascade_count_matches_dependents() {
    let mut registry = Registry::new();

    let driver = registry.driver();
    let bystander = registry.driver();
    let bystander_car = registry.car(bystander);
    registry.fine(bystander_car, bystander);

    let cars: Vec<RecordId> = (0..3).map(|_| registry.car(driver)).collect();
    for car in &cars {
        registry.fine(*car, driver);
        registry.fine(*car, driver);
    }

    let removed = registry.engine.delete("driver", driver).unwrap();
    assert_eq!(removed.len(), 3 + 6 + 1);

    assert_eq!(registry.count("Driver"), 1);
    assert_eq!(registry.count("Car"), 1);
    assert_eq!(registry.count("Fine"), 1);
}

/// Dependents are listed before the records they reference.
#[test]
fn test_removal_order_is_dependents_first() {
    let mut registry = Registry::new();

    let driver = registry.driver();
    let car = registry.car(driver);
    let fine = registry.fine(car, driver);

    let removed = registry.engine.delete("Driver", driver).unwrap();

    let position = |key: RecordKey| removed.iter().position(|k| *k == key).unwrap();
    assert!(position(RecordKey::new("Fine", fine)) < position(RecordKey::new("Car", car)));
    assert!(position(RecordKey::new("Car", car)) < position(RecordKey::new("Driver", driver)));
    assert_eq!(removed.last(), Some(&RecordKey::new("Driver", driver)));
}

/// Deleting a car keeps its driver and only drops the car's fines.
#[test]
fn test_car_delete_removes_only_its_fines() {
    let mut registry = Registry::new();

    let driver = registry.driver();
    let first = registry.car(driver);
    let second = registry.car(driver);
    registry.fine(first, driver);
    let kept = registry.fine(second, driver);

    let removed = registry.engine.delete("Car", first).unwrap();
    assert_eq!(removed.len(), 2);

    assert!(registry.exists("Driver", driver));
    assert!(registry.exists("Car", second));
    assert!(registry.exists("Fine", kept));
}

/// A fine has no dependents.
#[test]
fn test_leaf_delete() {
    let mut registry = Registry::new();

    let driver = registry.driver();
    let car = registry.car(driver);
    let fine = registry.fine(car, driver);

    let removed = registry.engine.delete("FINE", fine).unwrap();
    assert_eq!(removed, vec![RecordKey::new("Fine", fine)]);
    assert_eq!(registry.count("Car"), 1);
}

/// Deleted ids are not handed out again.
#[test]
fn test_ids_not_reused_after_delete() {
    let mut registry = Registry::new();

    let first = registry.driver();
    registry.engine.delete("Driver", first).unwrap();
    let second = registry.driver();

    assert_ne!(first, second);
}
