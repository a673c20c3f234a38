//! CLI command implementations
//!
//! Every command except `init` follows the same sequence: load the config,
//! load the catalog, open the snapshot, run one engine operation and, for
//! successful writes, save the snapshot back.
//!
//! Engine failures (unknown type, missing record, validation) are normal
//! responses. Only config, descriptor and snapshot problems are [`CliError`]s.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use crate::codec::FormData;
use crate::domain;
use crate::engine::{CrudEngine, EngineError, EngineResult};
use crate::observability::{self, Event};
use crate::schema::MetadataCatalog;
use crate::store::{MemoryStore, RecordId};

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliErrorCode, CliResult};
use super::io::{engine_error_response, ok_response, read_form, write_json};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run a command, reading form data from stdin when needed
pub fn run_command(cmd: Command) -> CliResult<()> {
    let response = execute(cmd, io::stdin().lock())?;
    write_json(&response)
}

/// Run a command and return its JSON response
pub fn execute(cmd: Command, input: impl Read) -> CliResult<Value> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Types { config } => {
            let session = Session::open(&config)?;
            Ok(ok_response(json!({ "types": session.types() })))
        }
        Command::List { type_name, config } => {
            let session = Session::open(&config)?;
            respond(session.list(&type_name))
        }
        Command::Get {
            type_name,
            id,
            config,
        } => {
            let session = Session::open(&config)?;
            respond(
                session
                    .engine
                    .get(&type_name, RecordId(id))
                    .map(|values| json!(values)),
            )
        }
        Command::Create {
            type_name,
            fields,
            config,
        } => {
            let form = collect_form(fields, input)?;
            let session = Session::open(&config)?;
            let result = session.engine.create(&type_name, &form);
            if result.is_ok() {
                session.save()?;
            }
            respond(result.map(|id| json!({ "id": id })))
        }
        Command::Update {
            type_name,
            id,
            fields,
            config,
        } => {
            let form = collect_form(fields, input)?;
            let session = Session::open(&config)?;
            let result = session.engine.update(&type_name, RecordId(id), &form);
            if result.is_ok() {
                session.save()?;
            }
            respond(result.map(|()| json!({ "id": id })))
        }
        Command::Delete {
            type_name,
            id,
            config,
        } => {
            let session = Session::open(&config)?;
            let result = session.engine.delete(&type_name, RecordId(id));
            if result.is_ok() {
                session.save()?;
            }
            respond(result.map(|removed| json!({ "deleted": removed })))
        }
    }
}

/// Initialize a new data directory
///
/// - Creates the data directory
/// - Exports the built-in descriptors when `schema_dir` holds none
/// - Writes an empty snapshot with a table per type
pub fn init(config_path: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    observability::init(&config.log_filter)?;

    if is_initialized(&config) {
        return Err(CliError::already_initialized());
    }

    fs::create_dir_all(config.data_path()).map_err(|e| {
        CliError::config_error(format!(
            "Failed to create directory {:?}: {}",
            config.data_path(),
            e
        ))
    })?;

    if let Some(schema_dir) = config.schema_path() {
        export_descriptors(schema_dir)?;
    }

    let catalog = load_catalog(&config)?;
    let store = MemoryStore::for_catalog(&catalog);
    store.save(&config.snapshot_path())?;

    info!(
        event = %Event::SnapshotSaved,
        path = %config.snapshot_path().display(),
        "empty snapshot written"
    );

    Ok(ok_response(json!({
        "initialized": true,
        "types": catalog.list_types(),
    })))
}

/// Check if a data directory is initialized
fn is_initialized(config: &Config) -> bool {
    config.snapshot_path().exists()
}

/// Writes the built-in descriptors unless the directory already has some.
fn export_descriptors(dir: &Path) -> CliResult<()> {
    fs::create_dir_all(dir).map_err(|e| {
        CliError::config_error(format!("Failed to create directory {:?}: {}", dir, e))
    })?;

    let has_descriptors = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .any(|entry| entry.path().extension().is_some_and(|ext| ext == "json"));
    if has_descriptors {
        return Ok(());
    }

    let descriptors = domain::descriptors();
    for descriptor in &descriptors {
        MetadataCatalog::save_descriptor(dir, descriptor)?;
    }

    info!(
        event = %Event::DescriptorsExported,
        dir = %dir.display(),
        count = descriptors.len(),
        "built-in descriptors exported"
    );
    Ok(())
}

/// Descriptors from `schema_dir`, or the built-in traffic types.
fn load_catalog(config: &Config) -> CliResult<MetadataCatalog> {
    let catalog = match config.schema_path() {
        Some(dir) => MetadataCatalog::from_dir(dir)?,
        None => domain::traffic_catalog()?,
    };

    info!(
        event = %Event::CatalogBuilt,
        types = catalog.len(),
        "catalog built"
    );
    Ok(catalog)
}

/// Form data from `--field` arguments, or from stdin when none were given.
fn collect_form(fields: Vec<(String, String)>, input: impl Read) -> CliResult<FormData> {
    if fields.is_empty() {
        return read_form(input);
    }

    let mut form = FormData::new();
    for (name, value) in fields {
        if form.insert(name.clone(), value).is_some() {
            return Err(CliError::invalid_input(format!(
                "Field '{}' given more than once",
                name
            )));
        }
    }
    Ok(form)
}

/// Turns an engine outcome into a response; store failures stay fatal.
fn respond(result: EngineResult<Value>) -> CliResult<Value> {
    match result {
        Ok(data) => Ok(ok_response(data)),
        Err(EngineError::Store(e)) => Err(e.into()),
        Err(e) => Ok(engine_error_response(&e)),
    }
}

/// A loaded config with an engine over the snapshot
struct Session {
    config: Config,
    engine: CrudEngine<MemoryStore>,
}

impl Session {
    fn open(config_path: &Path) -> CliResult<Self> {
        let config = Config::load(config_path)?;
        observability::init(&config.log_filter)?;

        info!(
            event = %Event::ConfigLoaded,
            path = %config_path.display(),
            "config loaded"
        );

        if !is_initialized(&config) {
            return Err(CliError::not_initialized());
        }

        let catalog = Arc::new(load_catalog(&config)?);
        let store = MemoryStore::load(&config.snapshot_path(), &catalog)?;

        info!(
            event = %Event::StoreOpened,
            path = %config.snapshot_path().display(),
            "store opened"
        );

        let engine = CrudEngine::new(catalog, store)
            .map_err(|e| CliError::new(CliErrorCode::SchemaError, e.to_string()))?;

        Ok(Self { config, engine })
    }

    fn types(&self) -> Vec<Value> {
        self.engine
            .catalog()
            .descriptors()
            .map(|d| {
                json!({
                    "name": d.name,
                    "description": d.description,
                    "fields": d.field_names().collect::<Vec<_>>(),
                })
            })
            .collect()
    }

    fn list(&self, type_name: &str) -> EngineResult<Value> {
        let listing = self.engine.list(type_name)?;
        Ok(json!({
            "type": listing.descriptor.name,
            "headers": listing.headers(),
            "rows": listing.rows,
        }))
    }

    fn save(&self) -> CliResult<()> {
        let path = self.config.snapshot_path();
        self.engine.store().save(&path)?;

        info!(
            event = %Event::SnapshotSaved,
            path = %path.display(),
            "snapshot saved"
        );
        Ok(())
    }
}
