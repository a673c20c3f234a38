//! Cascade planning for deletes
//!
//! Deleting a record also deletes every record that holds a mandatory
//! reference to it, transitively. Nullable references to a deleted record
//! are cleared instead. The plan is computed up front from the catalog's
//! reference graph and turned into a single [`WriteBatch`]. The batch ends
//! with one guard per removed record and referencing field, so a reference
//! written after planning fails the delete instead of dangling.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::store::{Precondition, Record, RecordKey, Store, StoreResult, WriteBatch};
use crate::schema::MetadataCatalog;

/// Everything a delete will touch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadePlan {
    /// Records to delete, dependents before the records they point at
    pub removals: Vec<RecordKey>,
    /// Surviving records with their references to removed records cleared
    pub detachments: Vec<Record>,
    /// Conditions that must still hold once the removals are applied
    pub guards: Vec<Precondition>,
}

impl CascadePlan {
    /// Batch that clears references, removes records and then checks guards.
    pub fn into_batch(self) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for record in self.detachments {
            batch = batch.merge(record);
        }
        for key in self.removals {
            batch = batch.remove(key);
        }
        for guard in self.guards {
            batch = batch.check(guard);
        }
        batch
    }
}

/// Walks dependents of a record through the store.
pub struct CascadePlanner<'a, S: Store + ?Sized> {
    catalog: &'a MetadataCatalog,
    store: &'a S,
}

/// Working state of one planning run
#[derive(Default)]
struct Walk {
    /// `find_all` results per type, fetched once per plan
    tables: HashMap<String, Vec<Record>>,
    visited: HashSet<RecordKey>,
    removals: Vec<RecordKey>,
    detached: BTreeMap<RecordKey, Record>,
}

impl<'a, S: Store + ?Sized> CascadePlanner<'a, S> {
    pub fn new(catalog: &'a MetadataCatalog, store: &'a S) -> Self {
        Self { catalog, store }
    }

    /// Plans the removal of `root` and everything that depends on it.
    ///
    /// `root` must name a canonical type; its existence is the caller's
    /// concern.
    pub fn plan(&self, root: RecordKey) -> StoreResult<CascadePlan> {
        let mut walk = Walk::default();
        self.visit(root, &mut walk)?;

        let removed: HashSet<&RecordKey> = walk.removals.iter().collect();
        let detachments = walk
            .detached
            .into_iter()
            .filter(|(key, _)| !removed.contains(key))
            .map(|(_, record)| record)
            .collect();

        let guards = walk
            .removals
            .iter()
            .flat_map(|key| {
                self.catalog
                    .dependents_of(&key.type_name)
                    .into_iter()
                    .map(move |(dependent, field)| Precondition::Unreferenced {
                        key: key.clone(),
                        holder: dependent.name.clone(),
                        field: field.name.clone(),
                    })
            })
            .collect();

        Ok(CascadePlan {
            removals: walk.removals,
            detachments,
            guards,
        })
    }

    /// Post-order walk: dependents are queued for removal before `key`.
    fn visit(&self, key: RecordKey, walk: &mut Walk) -> StoreResult<()> {
        if !walk.visited.insert(key.clone()) {
            return Ok(());
        }

        for (dependent, field) in self.catalog.dependents_of(&key.type_name) {
            if !walk.tables.contains_key(&dependent.name) {
                let records = self.store.find_all(&dependent.name)?;
                walk.tables.insert(dependent.name.clone(), records);
            }

            let holders: Vec<Record> = walk
                .tables
                .get(&dependent.name)
                .map(|records| {
                    records
                        .iter()
                        .filter(|record| record.references(&field.name, key.id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            for holder in holders {
                let Some(holder_key) = holder.key() else {
                    continue;
                };

                if field.nullable {
                    walk.detached
                        .entry(holder_key)
                        .or_insert(holder)
                        .unset(&field.name);
                } else {
                    self.visit(holder_key, walk)?;
                }
            }
        }

        walk.removals.push(key);
        Ok(())
    }
}
