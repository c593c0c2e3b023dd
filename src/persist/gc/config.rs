use super::error::GcError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default scan cadence for the defunct-tombstone sweep, shared by both
/// sweepers unless overridden.
pub const DEFAULT_DEFUNCT_SCAN_INTERVAL_MS: u64 = 60_000;

/// Per-sweeper knobs: how long a tombstone lives, and whether expired
/// tombstones are reclaimed one at a time or accumulated into a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweeperTuning {
    pub expiry_ms: u64,
    pub batch_mode: bool,
}

impl SweeperTuning {
    /// Minimum age a tombstone must reach before any age-based path —
    /// forced or not — is allowed to remove it.
    pub fn min_retention_ms(&self) -> u64 {
        self.expiry_ms / 10
    }
}

/// Test-only knobs, never consulted by production code paths that would
/// bypass the minimum-retention floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcTestHooks {
    pub force_gc_memory_events: bool,
    pub idle_expiration: bool,
    pub debug_tombstone_count: bool,
}

/// Full configuration for the tombstone reclamation subsystem: one
/// `SweeperTuning` per sweeper plus the thresholds and scan cadence they
/// share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcConfig {
    pub replicated: SweeperTuning,
    pub non_replicated: SweeperTuning,
    pub expired_limit: usize,
    pub defunct_scan_interval_ms: u64,
    pub gc_memory_threshold_pct: u8,
    pub max_sleep_ms: u64,
    pub min_scan_floor_ms: u64,
    pub test_hooks: GcTestHooks,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            replicated: SweeperTuning {
                expiry_ms: 600_000,
                batch_mode: true,
            },
            non_replicated: SweeperTuning {
                expiry_ms: 480_000,
                batch_mode: false,
            },
            expired_limit: 100_000,
            defunct_scan_interval_ms: DEFAULT_DEFUNCT_SCAN_INTERVAL_MS,
            gc_memory_threshold_pct: 30,
            max_sleep_ms: 10_000,
            min_scan_floor_ms: 100,
            test_hooks: GcTestHooks::default(),
        }
    }
}

impl GcConfig {
    /// Fraction of max heap that must remain free before the memory
    /// pressure heuristic starts nudging batch reclamation forward.
    pub fn gc_memory_threshold_ratio(&self) -> f64 {
        f64::from(self.gc_memory_threshold_pct) / 100.0
    }

    pub fn scan_interval_ms(&self, tuning: SweeperTuning) -> u64 {
        self.defunct_scan_interval_ms.min(tuning.expiry_ms)
    }

    /// Parses the stringly-typed option names the rest of the crate uses
    /// for connection/runtime options (`tombstone-timeout`, etc.) into a
    /// config, starting from the defaults. Unknown keys are ignored.
    pub fn from_options(options: &BTreeMap<String, String>) -> Result<Self, GcError> {
        let mut config = Self::default();

        if let Some(v) = options.get("tombstone-timeout") {
            config.replicated.expiry_ms = parse_u64("tombstone-timeout", v)?;
        }
        if let Some(v) = options.get("non-replicated-tombstone-timeout") {
            config.non_replicated.expiry_ms = parse_u64("non-replicated-tombstone-timeout", v)?;
        }
        if let Some(v) = options.get("tombstone-gc-threshold") {
            config.expired_limit = parse_u64("tombstone-gc-threshold", v)? as usize;
        }
        if let Some(v) = options.get("tombstone-scan-interval") {
            config.defunct_scan_interval_ms = parse_u64("tombstone-scan-interval", v)?;
        }
        if let Some(v) = options.get("tombstone-gc-memory-threshold") {
            let pct = parse_u64("tombstone-gc-memory-threshold", v)?;
            if pct > 100 {
                return Err(GcError::InvalidConfig(
                    "tombstone-gc-memory-threshold".into(),
                    format!("{pct} is not a percentage"),
                ));
            }
            config.gc_memory_threshold_pct = pct as u8;
        }
        if let Some(v) = options.get("FORCE_GC_MEMORY_EVENTS") {
            config.test_hooks.force_gc_memory_events = parse_bool("FORCE_GC_MEMORY_EVENTS", v)?;
        }
        if let Some(v) = options.get("IDLE_EXPIRATION") {
            config.test_hooks.idle_expiration = parse_bool("IDLE_EXPIRATION", v)?;
        }
        if let Some(v) = options.get("DEBUG_TOMBSTONE_COUNT") {
            config.test_hooks.debug_tombstone_count = parse_bool("DEBUG_TOMBSTONE_COUNT", v)?;
        }

        Ok(config)
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, GcError> {
    value
        .parse::<u64>()
        .map_err(|err| GcError::InvalidConfig(key.to_string(), err.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, GcError> {
    value
        .parse::<bool>()
        .map_err(|err| GcError::InvalidConfig(key.to_string(), err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = GcConfig::default();
        assert_eq!(config.replicated.expiry_ms, 600_000);
        assert_eq!(config.non_replicated.expiry_ms, 480_000);
        assert_eq!(config.expired_limit, 100_000);
        assert_eq!(config.defunct_scan_interval_ms, 60_000);
        assert!((config.gc_memory_threshold_ratio() - 0.30).abs() < f64::EPSILON);
    }

    #[test]
    fn from_options_overrides_only_named_keys() {
        let mut options = BTreeMap::new();
        options.insert("tombstone-timeout".to_string(), "1000".to_string());
        let config = GcConfig::from_options(&options).unwrap();
        assert_eq!(config.replicated.expiry_ms, 1000);
        assert_eq!(config.non_replicated.expiry_ms, 480_000);
    }

    #[test]
    fn from_options_rejects_garbage() {
        let mut options = BTreeMap::new();
        options.insert("tombstone-gc-threshold".to_string(), "not-a-number".to_string());
        assert!(GcConfig::from_options(&options).is_err());
    }
}
