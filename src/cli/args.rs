//! CLI argument definitions using clap
//!
//! Commands:
//! - roadbook init --config <path>
//! - roadbook types --config <path>
//! - roadbook list <type> --config <path>
//! - roadbook get <type> <id> --config <path>
//! - roadbook create <type> [--field name=value]... --config <path>
//! - roadbook update <type> <id> [--field name=value]... --config <path>
//! - roadbook delete <type> <id> --config <path>
//!
//! Without any `--field`, create and update read one JSON object of field
//! values from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file location
pub const DEFAULT_CONFIG: &str = "./roadbook.json";

/// roadbook - a schema-driven registry of drivers, cars and traffic fines
#[derive(Parser, Debug)]
#[command(name = "roadbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// List the registered record types
    Types {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// List every record of a type
    List {
        /// Record type (case-insensitive)
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Show one record as editable field values
    Get {
        /// Record type (case-insensitive)
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Record id
        id: i64,

        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Create a record
    Create {
        /// Record type (case-insensitive)
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Field value as name=value; repeatable
        #[arg(long = "field", short = 'f', value_name = "NAME=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Change fields of an existing record
    Update {
        /// Record type (case-insensitive)
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Record id
        id: i64,

        /// Field value as name=value; repeatable
        #[arg(long = "field", short = 'f', value_name = "NAME=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Delete a record and everything that depends on it
    Delete {
        /// Record type (case-insensitive)
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Record id
        id: i64,

        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}

/// Parses `name=value`; the value may be empty and may contain `=`.
pub fn parse_field(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;

    if name.trim().is_empty() {
        return Err(format!("missing field name in '{}'", s));
    }

    Ok((name.to_string(), value.to_string()))
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
