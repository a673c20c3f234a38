//! Concurrent Write Tests
//!
//! Writes racing on one engine from several threads must leave the store
//! consistent:
//! - A car created while its driver is being deleted never survives the
//!   driver
//! - Of several creates with the same unique value, exactly one commits

use std::sync::{Arc, Barrier};
use std::thread;

use roadbook::codec::{FieldValue, FormData};
use roadbook::domain;
use roadbook::engine::{CrudEngine, EngineError};
use roadbook::schema::ErrorKind;
use roadbook::store::{MemoryStore, RecordId, Store};

// =============================================================================
// Helper Functions
// =============================================================================

const ROUNDS: usize = 25;

fn engine() -> CrudEngine<MemoryStore> {
    let catalog = Arc::new(domain::traffic_catalog().unwrap());
    let store = MemoryStore::for_catalog(&catalog);
    CrudEngine::new(catalog, store).unwrap()
}

fn form(pairs: &[(&str, &str)]) -> FormData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn create_driver(engine: &CrudEngine<MemoryStore>, license: &str) -> Result<RecordId, EngineError> {
    engine.create(
        "Driver",
        &form(&[
            ("name", "Racer"),
            ("licenseNumber", license),
            ("birthDate", "1982-04-12"),
        ]),
    )
}

fn create_car(
    engine: &CrudEngine<MemoryStore>,
    plate: &str,
    driver: RecordId,
) -> Result<RecordId, EngineError> {
    engine.create(
        "Car",
        &form(&[
            ("country", "RU"),
            ("model", "Niva"),
            ("licensePlate", plate),
            ("year", "1999"),
            ("driver", driver.to_string().as_str()),
        ]),
    )
}

fn rejected_with(err: &EngineError, kind: ErrorKind) -> bool {
    err.validation()
        .map_or(false, |errors| errors.contains_kind(kind))
}

/// Cars whose driver reference points at no driver.
fn orphaned_cars(engine: &CrudEngine<MemoryStore>) -> usize {
    let store = engine.store();
    store
        .find_all("Car")
        .unwrap()
        .iter()
        .filter(|car| match car.get("driver") {
            Some(FieldValue::Reference(id)) => store.find_by_id("Driver", *id).unwrap().is_none(),
            _ => true,
        })
        .count()
}

// =============================================================================
// Delete Against Create Tests
// =============================================================================

/// A driver deleted while cars are being registered to it leaves no car
/// pointing at it.
#[test]
fn test_delete_racing_creates_leaves_no_orphans() {
    let engine = engine();

    for round in 0..ROUNDS {
        let driver = create_driver(&engine, &format!("D{:04}", round)).unwrap();
        let barrier = Barrier::new(2);

        thread::scope(|scope| {
            scope.spawn(|| {
                barrier.wait();
                for i in 0..20 {
                    let plate = format!("P{:04}{:03}", round, i);
                    if let Err(err) = create_car(&engine, &plate, driver) {
                        assert!(
                            rejected_with(&err, ErrorKind::ReferenceNotFound),
                            "unexpected create failure: {}",
                            err
                        );
                    }
                }
            });

            scope.spawn(|| {
                barrier.wait();
                loop {
                    match engine.delete("Driver", driver) {
                        Ok(_) => break,
                        Err(EngineError::Conflict(_)) => continue,
                        Err(err) => panic!("unexpected delete failure: {}", err),
                    }
                }
            });
        });

        assert_eq!(orphaned_cars(&engine), 0, "orphaned car after round {}", round);
    }

    assert_eq!(engine.store().count("Driver").unwrap(), 0);
    assert_eq!(engine.store().count("Car").unwrap(), 0);
}

/// A car created just before the delete commits is either removed with
/// the driver or makes the delete retry; it never outlives the driver.
#[test]
fn test_conflicting_delete_can_be_retried() {
    let engine = engine();
    let driver = create_driver(&engine, "D9999").unwrap();
    let barrier = Barrier::new(3);

    thread::scope(|scope| {
        for worker in 0..2 {
            let engine = &engine;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                for i in 0..50 {
                    let plate = format!("W{}{:03}", worker, i);
                    if create_car(engine, &plate, driver).is_err() {
                        break;
                    }
                }
            });
        }

        barrier.wait();
        while let Err(err) = engine.delete("Driver", driver) {
            assert_eq!(err.code(), "ROADBOOK_CONFLICT");
        }
    });

    assert_eq!(orphaned_cars(&engine), 0);
    assert!(engine.store().find_by_id("Driver", driver).unwrap().is_none());
}

// =============================================================================
// Unique Field Tests
// =============================================================================

/// Several threads register the same license number at once: one wins.
#[test]
fn test_racing_unique_creates_commit_once() {
    let engine = engine();
    let threads = 4;

    for round in 0..ROUNDS {
        let license = format!("U{:04}", round);
        let barrier = Barrier::new(threads);

        let outcomes: Vec<Result<RecordId, EngineError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        create_driver(&engine, &license)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let committed = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        assert_eq!(committed, 1, "round {}", round);
        for err in outcomes.iter().filter_map(|outcome| outcome.as_ref().err()) {
            assert!(rejected_with(err, ErrorKind::UniqueViolation), "{}", err);
        }
    }

    assert_eq!(engine.store().count("Driver").unwrap(), ROUNDS);
}

/// An update racing a create for the same plate cannot produce duplicates.
#[test]
fn test_racing_update_and_create_keep_plate_unique() {
    let engine = engine();
    let driver = create_driver(&engine, "OWNER1").unwrap();

    for round in 0..ROUNDS {
        let car = create_car(&engine, &format!("OLD{:04}", round), driver).unwrap();
        let plate = format!("NEW{:04}", round);
        let barrier = Barrier::new(2);

        thread::scope(|scope| {
            scope.spawn(|| {
                barrier.wait();
                let _ = engine.update("Car", car, &form(&[("licensePlate", plate.as_str())]));
            });
            scope.spawn(|| {
                barrier.wait();
                let _ = create_car(&engine, &plate, driver);
            });
        });

        let holders = engine
            .store()
            .find_all("Car")
            .unwrap()
            .iter()
            .filter(|record| record.get("licensePlate") == Some(&FieldValue::String(plate.clone())))
            .count();
        assert_eq!(holders, 1, "round {}", round);
    }
}
