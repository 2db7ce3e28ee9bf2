//! # ECS Configuration
//!
//! Fixed capacities for one [`Registry`](crate::Registry). Loaded once at
//! startup, either from code or from a TOML file:
//!
//! ```toml
//! max_entities = 8192
//! max_systems = 32
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Default maximum number of live entities.
pub const DEFAULT_MAX_ENTITIES: usize = 4096;

/// Default maximum number of registered systems.
pub const DEFAULT_MAX_SYSTEMS: usize = 64;

/// Capacities of the ECS.
///
/// Every buffer the tick loop touches is sized from these values when the
/// registry and manager are built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EcsConfig {
    /// Maximum number of simultaneously live entities.
    pub max_entities: usize,
    /// Maximum number of registered systems.
    pub max_systems: usize,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
            max_systems: DEFAULT_MAX_SYSTEMS,
        }
    }
}

impl EcsConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if either capacity is zero or
    /// `max_entities` does not fit an entity id.
    pub fn new(max_entities: usize, max_systems: usize) -> EcsResult<Self> {
        let config = Self {
            max_entities,
            max_systems,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on parse or validation failure.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or is invalid.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EcsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks the capacity bounds.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] describing the first violated bound.
    pub fn validate(&self) -> EcsResult<()> {
        if self.max_entities == 0 {
            return Err(EcsError::InvalidConfig(
                "max_entities must be greater than zero".to_string(),
            ));
        }
        if self.max_entities > u32::MAX as usize {
            return Err(EcsError::InvalidConfig(
                "max_entities cannot exceed u32::MAX".to_string(),
            ));
        }
        if self.max_systems == 0 {
            return Err(EcsError::InvalidConfig(
                "max_systems must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
