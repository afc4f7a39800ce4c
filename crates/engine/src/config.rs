//! Runtime configuration via `tether.toml`
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working runtime. Values are validated when loaded and again by
//! `Runtime::with_config`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tether_core::{Error, Mask, Result};

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "tether.toml";

/// Runtime configuration loaded from `tether.toml`.
///
/// # Example
///
/// ```toml
/// state_capacity = 64
/// max_dispatch_work = 65536
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Number of named state bits available to `define_state` (1..=64).
    #[serde(default = "default_state_capacity")]
    pub state_capacity: u32,
    /// Observer-deferred commands applied for one top-level mutation.
    /// Further deferred commands are rejected; notifications are never dropped.
    #[serde(default = "default_max_dispatch_work")]
    pub max_dispatch_work: usize,
}

fn default_state_capacity() -> u32 {
    Mask::BITS
}

fn default_max_dispatch_work() -> usize {
    65_536
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            state_capacity: default_state_capacity(),
            max_dispatch_work: default_max_dispatch_work(),
        }
    }
}

impl RuntimeConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `state_capacity` is outside 1..=64 or
    /// `max_dispatch_work` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.state_capacity == 0 || self.state_capacity > Mask::BITS {
            return Err(Error::InvalidConfig(format!(
                "state_capacity must be between 1 and {}, got {}",
                Mask::BITS,
                self.state_capacity
            )));
        }
        if self.max_dispatch_work == 0 {
            return Err(Error::InvalidConfig(
                "max_dispatch_work must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Tether runtime configuration
#
# Named state bits available to define_state (1..=64, default 64)
state_capacity = 64

# Commands deferred by observers that one top-level mutation may apply.
# Past this bound further deferred commands are rejected and logged;
# every queued notification is still delivered.
max_dispatch_work = 65536
"#
    }

    /// Parse and validate config text.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` on malformed TOML, unknown keys or out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RuntimeConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::InvalidConfig(msg) => {
                Error::InvalidConfig(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Serialize this config to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))
    }
}
