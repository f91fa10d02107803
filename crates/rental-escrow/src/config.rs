//! # Configuration
//!
//! Typed configuration for the escrow executor and the reference ledger,
//! loadable from YAML. Every field has a default, so an empty document is
//! a valid configuration.
//!
//! ```yaml
//! genesis_timestamp: 1729267200
//! escrow:
//!   grace_period_secs: 2592000
//! ```

use std::path::Path;

use rental_core::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default timeout grace period after `lease_end`: 30 days.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 2_592_000;

/// Executor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscrowConfig {
    /// Seconds after `lease_end` before the vendor may claim by timeout.
    pub grace_period_secs: u64,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
        }
    }
}

/// Reference ledger configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Ledger clock at construction.
    pub genesis_timestamp: Timestamp,
    /// Configuration applied to every contract deployed on the ledger.
    pub escrow: EscrowConfig,
}

impl LedgerConfig {
    /// Parse from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            grace_period_secs = config.escrow.grace_period_secs,
            "loaded ledger config"
        );
        Ok(config)
    }
}

impl EscrowConfig {
    /// Parse from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}
