//! CLI module for roadbook
//!
//! Provides command-line access to the CRUD engine:
//! - init: Create the data directory and an empty snapshot
//! - types: List registered record types
//! - list / get: Read records
//! - create / update / delete: Change records, then save the snapshot

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, DEFAULT_CONFIG};
pub use commands::{execute, init, run, run_command};
pub use config::{Config, SNAPSHOT_FILE};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{engine_error_response, error_response, ok_response, read_form, write_json};
