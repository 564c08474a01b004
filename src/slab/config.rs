//! Allocator configuration
//!
//! Defaults match the constants exported from [`crate::slab`]. A config can
//! be read from a TOML string, or layered from an optional file and
//! `SLABMEM_*` environment variables.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Base slot granularity in bytes, and the smallest size class
pub const ALIGNMENT: usize = 16;

/// Slots held by one batch
pub const SLOTS_PER_BATCH: usize = 8;

/// Largest request, in multiples of [`ALIGNMENT`]
pub const MAX_REQUEST_CLASSES: usize = 5;

/// Largest request size in bytes
pub const MAX_REQUEST: usize = MAX_REQUEST_CLASSES * ALIGNMENT;

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "SLABMEM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlabConfig {
    /// Base slot size in bytes (power of two)
    pub alignment: usize,
    /// Slots per batch
    pub slots_per_batch: usize,
    /// Number of size classes above zero that may be requested
    pub max_request_classes: usize,
}

impl Default for SlabConfig {
    fn default() -> Self {
        Self {
            alignment: ALIGNMENT,
            slots_per_batch: SLOTS_PER_BATCH,
            max_request_classes: MAX_REQUEST_CLASSES,
        }
    }
}

impl SlabConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SlabConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file, then apply `SLABMEM_*` overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Load from an optional file, then apply `<prefix>_*` overrides
    pub fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config: SlabConfig = builder
            .add_source(config::Environment::with_prefix(prefix))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.alignment.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "alignment must be a non-zero power of two, got {}",
                self.alignment
            )));
        }
        if self.slots_per_batch == 0 {
            return Err(Error::InvalidConfig(
                "slots_per_batch must be at least 1".to_string(),
            ));
        }
        if self.max_request_classes == 0 {
            return Err(Error::InvalidConfig(
                "max_request_classes must be at least 1".to_string(),
            ));
        }
        self.max_request()
            .checked_mul(self.slots_per_batch)
            .ok_or_else(|| Error::InvalidConfig("batch size overflows usize".to_string()))?;
        Ok(())
    }

    /// Largest request size in bytes
    pub fn max_request(&self) -> usize {
        self.alignment.saturating_mul(self.max_request_classes)
    }

    /// Round `size` up to the next slot size
    pub fn slot_size_for(&self, size: usize) -> usize {
        size.div_ceil(self.alignment) * self.alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SlabConfig::default();
        assert_eq!(config.alignment, 16);
        assert_eq!(config.slots_per_batch, 8);
        assert_eq!(config.max_request(), 80);
        assert_eq!(MAX_REQUEST, 80);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_slot_size_rounding() {
        let config = SlabConfig::default();
        assert_eq!(config.slot_size_for(1), 16);
        assert_eq!(config.slot_size_for(16), 16);
        assert_eq!(config.slot_size_for(17), 32);
        assert_eq!(config.slot_size_for(80), 80);
    }

    #[test]
    fn test_from_toml() -> Result<()> {
        let config = SlabConfig::from_toml_str("alignment = 8\nslots_per_batch = 32\n")?;
        assert_eq!(config.alignment, 8);
        assert_eq!(config.slots_per_batch, 32);
        assert_eq!(config.max_request_classes, 5);
        assert_eq!(config.max_request(), 40);
        Ok(())
    }

    #[test]
    fn test_invalid_toml_values() {
        assert!(matches!(
            SlabConfig::from_toml_str("alignment = 12"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            SlabConfig::from_toml_str("alignment = 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(SlabConfig::from_toml_str("slots_per_batch = 0").is_err());
        assert!(SlabConfig::from_toml_str("max_request_classes = 0").is_err());
        assert!(matches!(
            SlabConfig::from_toml_str("alignment = \"big\""),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let path = std::env::temp_dir().join(format!("slabmem_config_{}.toml", std::process::id()));
        std::fs::write(&path, "slots_per_batch = 64\n").unwrap();

        // Prefix nobody sets, so the shell environment cannot leak in
        let config = SlabConfig::load_with_prefix(Some(&path), "SLABMEM_TEST_FILE_ONLY")?;
        assert_eq!(config.slots_per_batch, 64);
        assert_eq!(config.alignment, ALIGNMENT);

        std::fs::remove_file(path).ok();
        Ok(())
    }

    #[test]
    fn test_environment_overrides_file() -> Result<()> {
        let path = std::env::temp_dir().join(format!("slabmem_env_{}.toml", std::process::id()));
        std::fs::write(&path, "slots_per_batch = 64\n").unwrap();
        std::env::set_var("SLABMEM_TEST_OVERRIDE_SLOTS_PER_BATCH", "24");

        let config = SlabConfig::load_with_prefix(Some(&path), "SLABMEM_TEST_OVERRIDE")?;
        assert_eq!(config.slots_per_batch, 24);

        std::env::remove_var("SLABMEM_TEST_OVERRIDE_SLOTS_PER_BATCH");
        std::fs::remove_file(path).ok();
        Ok(())
    }
}
