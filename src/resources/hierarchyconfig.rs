//! Hierarchy maintenance configuration resource.
//!
//! Tuning knobs for relationship maintenance and transform propagation,
//! loaded from an INI file. Defaults are safe for any hierarchy shape.
//!
//! # Configuration File Format
//!
//! ```ini
//! [propagation]
//! max_depth = 1024
//! batch_size = 0
//!
//! [relationships]
//! detect_cycles = true
//! fixup_chunk_size = 64
//! validate = false
//! ```
//!
//! A `batch_size` of 0 lets bevy pick the parallel batch size automatically.

use bevy_ecs::batching::BatchingStrategy;
use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Default safe values for startup
const DEFAULT_MAX_DEPTH: usize = 1024;
const DEFAULT_BATCH_SIZE: usize = 0;
const DEFAULT_DETECT_CYCLES: bool = true;
const DEFAULT_FIXUP_CHUNK_SIZE: usize = 64;
const DEFAULT_VALIDATE: bool = false;
const DEFAULT_CONFIG_PATH: &str = "./hierarchy.ini";

/// Hierarchy configuration resource.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct HierarchyConfig {
    /// Deepest hierarchy level propagation will descend into. Also bounds
    /// ancestor walks during cycle detection.
    pub max_depth: usize,
    /// Fixed batch size for parallel queries; 0 means automatic.
    pub batch_size: usize,
    /// Walk the ancestor chain of reparented entities and break cycles.
    pub detect_cycles: bool,
    /// Parents handled by one parallel fixup work item.
    pub fixup_chunk_size: usize,
    /// Check hierarchy invariants after every cycle and log violations.
    pub validate: bool,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            batch_size: DEFAULT_BATCH_SIZE,
            detect_cycles: DEFAULT_DETECT_CYCLES,
            fixup_chunk_size: DEFAULT_FIXUP_CHUNK_SIZE,
            validate: DEFAULT_VALIDATE,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Batching strategy for `par_iter` calls.
    pub fn batching(&self) -> BatchingStrategy {
        match self.batch_size {
            0 => BatchingStrategy::new(),
            n => BatchingStrategy::fixed(n),
        }
    }

    /// Fixup chunk size, never zero.
    pub fn chunk_size(&self) -> usize {
        self.fixup_chunk_size.max(1)
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current values. Returns an error if the
    /// file cannot be read or a present value does not parse.
    pub fn load_from_file(&mut self) -> Result<(), ConfigError> {
        let mut config = Ini::new();
        config.load(&self.config_path).map_err(|reason| ConfigError::Load {
            path: self.config_path.clone(),
            reason,
        })?;

        // [propagation] section
        if let Some(depth) = get_uint(&config, "propagation", "max_depth")? {
            self.max_depth = depth;
        }
        if let Some(batch) = get_uint(&config, "propagation", "batch_size")? {
            self.batch_size = batch;
        }

        // [relationships] section
        if let Some(detect) = get_bool(&config, "relationships", "detect_cycles")? {
            self.detect_cycles = detect;
        }
        if let Some(chunk) = get_uint(&config, "relationships", "fixup_chunk_size")? {
            self.fixup_chunk_size = chunk;
        }
        if let Some(validate) = get_bool(&config, "relationships", "validate")? {
            self.validate = validate;
        }

        info!(
            "Loaded hierarchy config: max_depth={}, batch_size={}, detect_cycles={}, fixup_chunk_size={}, validate={}",
            self.max_depth,
            self.batch_size,
            self.detect_cycles,
            self.fixup_chunk_size,
            self.validate
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let mut config = Ini::new();

        // [propagation] section
        config.set("propagation", "max_depth", Some(self.max_depth.to_string()));
        config.set("propagation", "batch_size", Some(self.batch_size.to_string()));

        // [relationships] section
        config.set(
            "relationships",
            "detect_cycles",
            Some(self.detect_cycles.to_string()),
        );
        config.set(
            "relationships",
            "fixup_chunk_size",
            Some(self.fixup_chunk_size.to_string()),
        );
        config.set("relationships", "validate", Some(self.validate.to_string()));

        config
            .write(&self.config_path)
            .map_err(|source| ConfigError::Save {
                path: self.config_path.clone(),
                source,
            })?;

        info!("Saved hierarchy config to {:?}", self.config_path);

        Ok(())
    }
}

fn get_uint(
    config: &Ini,
    section: &'static str,
    key: &'static str,
) -> Result<Option<usize>, ConfigError> {
    config
        .getuint(section, key)
        .map(|value| value.map(|v| v as usize))
        .map_err(|_| ConfigError::InvalidValue {
            section,
            key,
            value: config.get(section, key).unwrap_or_default(),
        })
}

fn get_bool(
    config: &Ini,
    section: &'static str,
    key: &'static str,
) -> Result<Option<bool>, ConfigError> {
    config
        .getbool(section, key)
        .map_err(|_| ConfigError::InvalidValue {
            section,
            key,
            value: config.get(section, key).unwrap_or_default(),
        })
}
