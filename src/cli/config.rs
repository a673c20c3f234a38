//! Configuration file
//!
//! ```json
//! {
//!     "data_dir": "./data",
//!     "schema_dir": "./schemas",
//!     "log_filter": "info"
//! }
//! ```
//!
//! Only `data_dir` is required. Without `schema_dir` the built-in traffic
//! record types are used.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};

/// Snapshot file name inside the data directory
pub const SNAPSHOT_FILE: &str = "records.json";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// Directory of JSON type descriptors (optional)
    #[serde(default)]
    pub schema_dir: Option<String>,

    /// Log filter directive (optional, default "info"); `RUST_LOG` overrides it
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if let Some(schema_dir) = &self.schema_dir {
            if schema_dir.trim().is_empty() {
                return Err(CliError::config_error("schema_dir must not be empty when set"));
            }
        }

        if self.log_filter.trim().is_empty() {
            return Err(CliError::config_error("log_filter must not be empty"));
        }

        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// Location of the record snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_path().join(SNAPSHOT_FILE)
    }

    /// Descriptor directory, if configured
    pub fn schema_path(&self) -> Option<&Path> {
        self.schema_dir.as_deref().map(Path::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_config(temp_dir: &TempDir, value: serde_json::Value) -> PathBuf {
        let path = temp_dir.path().join("roadbook.json");
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, json!({ "data_dir": "/var/lib/roadbook" }));

        let config = Config::load(&path).unwrap();
        assert_eq!(config.log_filter, "info");
        assert!(config.schema_path().is_none());
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/var/lib/roadbook").join(SNAPSHOT_FILE)
        );
    }

    #[test]
    fn test_config_requires_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, json!({ "log_filter": "debug" }));
        assert!(Config::load(&path).is_err());

        let path = write_config(&temp_dir, json!({ "data_dir": "  " }));
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_config_rejects_empty_log_filter() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, json!({ "data_dir": "d", "log_filter": "" }));
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load(&temp_dir.path().join("absent.json")).unwrap_err();
        assert!(err.message().contains("Failed to read config"));
    }
}
