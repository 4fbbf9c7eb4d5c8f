//! Placement configuration.

use serde::Deserialize;

use crate::error::PlacementError;

/// Partition count used when the configured value is zero.
///
/// Prime, so `hash % partition_count` spreads keys evenly.
pub const DEFAULT_PARTITION_COUNT: u64 = 271;

/// Vnodes per unit of weight used when the configured value is zero.
pub const DEFAULT_REPLICATION_FACTOR: u64 = 20;

/// Load factor used when the configured value is zero.
pub const DEFAULT_LOAD: f64 = 1.25;

/// Tuning knobs for a [`WeightedRing`](crate::WeightedRing).
///
/// Any field left at zero takes its documented default when the ring is
/// built, so a config deserialized from a partial TOML table still works.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Number of fixed logical partitions keys are bucketed into.
    pub partition_count: u64,
    /// Virtual nodes generated per unit of member weight.
    pub replication_factor: u64,
    /// Slack multiplier over the perfectly even load. Must be at least 1.0.
    pub load: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            partition_count: DEFAULT_PARTITION_COUNT,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            load: DEFAULT_LOAD,
        }
    }
}

impl PlacementConfig {
    /// Replace zero-valued fields with their defaults.
    pub fn normalized(mut self) -> Self {
        if self.partition_count == 0 {
            self.partition_count = DEFAULT_PARTITION_COUNT;
        }
        if self.replication_factor == 0 {
            self.replication_factor = DEFAULT_REPLICATION_FACTOR;
        }
        if self.load == 0.0 {
            self.load = DEFAULT_LOAD;
        }
        self
    }

    /// Check a normalized config for values the bounded-load walk cannot use.
    pub fn validate(&self) -> Result<(), PlacementError> {
        if !self.load.is_finite() {
            return Err(PlacementError::InvalidConfig(format!(
                "load factor must be finite, got {}",
                self.load
            )));
        }
        if self.load < 1.0 {
            return Err(PlacementError::InvalidConfig(format!(
                "load factor must be at least 1.0, got {}",
                self.load
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_fields_take_defaults() {
        let cfg = PlacementConfig {
            partition_count: 0,
            replication_factor: 0,
            load: 0.0,
        }
        .normalized();
        assert_eq!(cfg, PlacementConfig::default());
    }

    #[test]
    fn test_explicit_fields_are_kept() {
        let cfg = PlacementConfig {
            partition_count: 71,
            replication_factor: 0,
            load: 1.1,
        }
        .normalized();
        assert_eq!(cfg.partition_count, 71);
        assert_eq!(cfg.replication_factor, DEFAULT_REPLICATION_FACTOR);
        assert_eq!(cfg.load, 1.1);
    }

    #[test]
    fn test_validate_rejects_small_or_nan_load() {
        let mut cfg = PlacementConfig::default();
        cfg.load = 0.5;
        assert!(matches!(
            cfg.validate(),
            Err(PlacementError::InvalidConfig(_))
        ));

        cfg.load = f64::NAN;
        assert!(matches!(
            cfg.validate(),
            Err(PlacementError::InvalidConfig(_))
        ));

        cfg.load = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg: PlacementConfig = toml::from_str("partition_count = 101").unwrap();
        assert_eq!(cfg.partition_count, 101);
        assert_eq!(cfg.replication_factor, DEFAULT_REPLICATION_FACTOR);
        assert_eq!(cfg.load, DEFAULT_LOAD);
    }
}
