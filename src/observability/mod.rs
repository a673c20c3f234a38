//! Observability subsystem for roadbook
//!
//! Logging goes through `tracing`. The CLI installs a `fmt` subscriber that
//! writes to stderr, leaving stdout for JSON responses. Library code only
//! emits events and never installs a subscriber itself.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the configured
//! `log_filter`.

mod events;

pub use events::Event;

use std::fmt;

use tracing_subscriber::EnvFilter;

/// Observability error
#[derive(Debug)]
pub struct ObservabilityError {
    message: String,
}

impl ObservabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ROADBOOK_OBSERVABILITY_FAILED: {}", self.message)
    }
}

impl std::error::Error for ObservabilityError {}

/// Result type for observability operations
pub type ObservabilityResult<T> = Result<T, ObservabilityError>;

/// Builds the filter: `RUST_LOG` wins over the configured directive.
pub fn filter_for(directive: &str) -> ObservabilityResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(directive).map_err(|e| {
            ObservabilityError::new(format!("Invalid log filter '{}': {}", directive, e))
        }),
    }
}

/// Installs the global stderr subscriber.
///
/// Installing twice is not an error; the first subscriber stays.
pub fn init(directive: &str) -> ObservabilityResult<()> {
    let filter = filter_for(directive)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
    Ok(())
}
