//! # In-Memory Store
//!
//! Keeps one table per registered type behind a single lock. Batches are
//! staged on copies of the tables they touch and swapped in only once every
//! mutation has succeeded, so a failing batch leaves no trace.
//!
//! The whole store can be written to and read back from a JSON snapshot.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::{StoreError, StoreResult};
use super::record::{Record, RecordId, RecordKey};
use super::{Mutation, Precondition, Store, WriteBatch};
use crate::schema::MetadataCatalog;

const SNAPSHOT_VERSION: u32 = 1;

/// Records of one type
#[derive(Debug, Clone)]
struct Table {
    /// Identity handed to the next persisted record
    next_id: i64,
    rows: BTreeMap<RecordId, Record>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    tables: Vec<TableSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableSnapshot {
    name: String,
    next_id: i64,
    records: Vec<Record>,
}

/// In-memory [`Store`] with JSON snapshots.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    /// Table names in registration order, for stable snapshots
    order: Vec<String>,
}

impl MemoryStore {
    /// Create an empty store with one table per type name
    pub fn new<I, S>(type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = type_names.into_iter().map(Into::into).collect();
        let tables = order
            .iter()
            .map(|name| (name.clone(), Table::default()))
            .collect();

        Self {
            tables: RwLock::new(tables),
            order,
        }
    }

    /// Create an empty store with a table for every catalog type
    pub fn for_catalog(catalog: &MetadataCatalog) -> Self {
        Self::new(catalog.list_types())
    }

    /// Load a snapshot written by [`MemoryStore::save`].
    ///
    /// Every table in the snapshot must belong to a catalog type; catalog
    /// types missing from the snapshot start empty.
    pub fn load(path: &Path, catalog: &MetadataCatalog) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::Snapshot(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| {
            StoreError::Snapshot(format!("Invalid snapshot {}: {}", path.display(), e))
        })?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Snapshot(format!(
                "Unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let store = Self::for_catalog(catalog);
        {
            let mut tables = store.tables.write().map_err(|_| StoreError::LockPoisoned)?;

            for table_snapshot in snapshot.tables {
                let name = catalog
                    .resolve(&table_snapshot.name)
                    .map(|d| d.name.clone())
                    .ok_or_else(|| StoreError::UnknownTable(table_snapshot.name.clone()))?;

                let mut table = Table {
                    next_id: table_snapshot.next_id,
                    rows: BTreeMap::new(),
                };

                for record in table_snapshot.records {
                    let id = record
                        .id()
                        .ok_or_else(|| StoreError::MissingIdentity(name.clone()))?;
                    if record.type_name() != name {
                        return Err(StoreError::Snapshot(format!(
                            "Record {}#{} stored under table {}",
                            record.type_name(),
                            id,
                            name
                        )));
                    }
                    if id.get() >= table.next_id {
                        return Err(StoreError::Snapshot(format!(
                            "Table {} hands out id {} which is already taken",
                            name, table.next_id
                        )));
                    }
                    table.rows.insert(id, record);
                }

                tables.insert(name, table);
            }
        }

        Ok(store)
    }

    /// Write the whole store to `path`.
    ///
    /// The snapshot goes to a sibling temp file first, is synced to disk and
    /// then renamed over `path`, so readers never see a half-written file
    /// and a crash never leaves an empty one behind.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let snapshot = {
            let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
            Snapshot {
                version: SNAPSHOT_VERSION,
                tables: self
                    .order
                    .iter()
                    .filter_map(|name| {
                        tables.get(name).map(|table| TableSnapshot {
                            name: name.clone(),
                            next_id: table.next_id,
                            records: table.rows.values().cloned().collect(),
                        })
                    })
                    .collect(),
            }
        };

        let content = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StoreError::Snapshot(format!("Failed to serialize snapshot: {}", e)))?;

        let temp_path = path.with_extension("json.tmp");
        let write_err = |e: std::io::Error| {
            StoreError::Snapshot(format!("Failed to write {}: {}", temp_path.display(), e))
        };
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(write_err)?;
            file.write_all(content.as_bytes()).map_err(write_err)?;
            file.sync_all().map_err(write_err)?;
        }

        fs::rename(&temp_path, path).map_err(|e| {
            StoreError::Snapshot(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        // Make the rename itself durable
        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                dir.sync_all().ok();
            }
        }

        Ok(())
    }

    /// Number of records of a type
    pub fn count(&self, type_name: &str) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        tables
            .get(type_name)
            .map(|table| table.rows.len())
            .ok_or_else(|| StoreError::UnknownTable(type_name.to_string()))
    }
}

/// Copy-on-write handle to a table for the batch being applied
fn stage<'a>(
    staged: &'a mut HashMap<String, Table>,
    tables: &HashMap<String, Table>,
    name: &str,
) -> StoreResult<&'a mut Table> {
    match staged.entry(name.to_string()) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            let current = tables
                .get(name)
                .ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
            Ok(entry.insert(current.clone()))
        }
    }
}

/// A table as the batch sees it so far
fn view<'a>(
    staged: &'a HashMap<String, Table>,
    tables: &'a HashMap<String, Table>,
    name: &str,
) -> StoreResult<&'a Table> {
    staged
        .get(name)
        .or_else(|| tables.get(name))
        .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
}

fn holds(
    precondition: &Precondition,
    staged: &HashMap<String, Table>,
    tables: &HashMap<String, Table>,
) -> StoreResult<bool> {
    let holds = match precondition {
        Precondition::Exists { key, .. } => view(staged, tables, &key.type_name)?
            .rows
            .contains_key(&key.id),
        Precondition::Unique {
            type_name,
            field,
            value,
            except,
        } => !view(staged, tables, type_name)?
            .rows
            .iter()
            .any(|(id, row)| Some(*id) != *except && row.get(field) == Some(value)),
        Precondition::Unreferenced { key, holder, field } => !view(staged, tables, holder)?
            .rows
            .values()
            .any(|row| row.references(field, key.id)),
    };
    Ok(holds)
}

impl Store for MemoryStore {
    fn registered_types(&self) -> Vec<String> {
        self.order.clone()
    }

    fn find_by_id(&self, type_name: &str, id: RecordId) -> StoreResult<Option<Record>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let table = tables
            .get(type_name)
            .ok_or_else(|| StoreError::UnknownTable(type_name.to_string()))?;
        Ok(table.rows.get(&id).cloned())
    }

    fn find_all(&self, type_name: &str) -> StoreResult<Vec<Record>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let table = tables
            .get(type_name)
            .ok_or_else(|| StoreError::UnknownTable(type_name.to_string()))?;
        Ok(table.rows.values().cloned().collect())
    }

    fn apply(&self, batch: WriteBatch) -> StoreResult<Vec<RecordId>> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;

        let mut staged: HashMap<String, Table> = HashMap::new();
        let mut assigned = Vec::new();
        let size = batch.len();

        for mutation in batch {
            match mutation {
                Mutation::Persist(mut record) => {
                    if let Some(key) = record.key() {
                        return Err(StoreError::AlreadyPersisted(key));
                    }
                    let table = stage(&mut staged, &tables, record.type_name())?;
                    let id = RecordId(table.next_id);
                    table.next_id += 1;
                    record.assign_id(id);
                    table.rows.insert(id, record);
                    assigned.push(id);
                }
                Mutation::Merge(record) => {
                    let key = record
                        .key()
                        .ok_or_else(|| StoreError::MissingIdentity(record.type_name().to_string()))?;
                    let table = stage(&mut staged, &tables, &key.type_name)?;
                    match table.rows.get_mut(&key.id) {
                        Some(row) => *row = record,
                        None => return Err(StoreError::MissingRecord(key)),
                    }
                }
                Mutation::Remove(key) => {
                    let table = stage(&mut staged, &tables, &key.type_name)?;
                    if table.rows.remove(&key.id).is_none() {
                        return Err(StoreError::MissingRecord(key));
                    }
                }
                Mutation::Check(precondition) => {
                    if !holds(&precondition, &staged, &tables)? {
                        debug!(%precondition, "write batch precondition failed");
                        return Err(StoreError::PreconditionFailed(precondition));
                    }
                }
            }
        }

        tables.extend(staged);
        debug!(mutations = size, "write batch applied");

        Ok(assigned)
    }
}
