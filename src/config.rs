//! Engine configuration
//!
//! Loaded from a TOML string supplied by the host; missing fields fall back
//! to defaults, and out-of-range timing values are clamped rather than
//! rejected.

use serde::Deserialize;

/// Bounds for the coalescer debounce window (ms)
pub const DEBOUNCE_MIN_MS: u64 = 10;
pub const DEBOUNCE_MAX_MS: u64 = 1000;
pub const DEBOUNCE_DEFAULT_MS: u64 = 100;

/// Bounds for the resolver staleness window (ms)
pub const STALENESS_MIN_MS: u64 = 100;
pub const STALENESS_MAX_MS: u64 = 10_000;
pub const STALENESS_DEFAULT_MS: u64 = 750;

/// Engine settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period before the coalescer emits a settled event (ms)
    pub debounce_ms: u64,
    /// How long a partial key sequence may wait for its next token (ms)
    pub staleness_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_DEFAULT_MS,
            staleness_ms: STALENESS_DEFAULT_MS,
        }
    }
}

impl EngineConfig {
    /// Parse from a TOML string, falling back to defaults on parse failure
    pub fn from_toml(content: &str) -> Self {
        match toml::from_str::<EngineConfig>(content) {
            Ok(config) => config.clamped(),
            Err(e) => {
                tracing::warn!("failed to parse engine config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Copy with both timing windows clamped into their valid ranges
    pub fn clamped(&self) -> Self {
        Self {
            debounce_ms: clamp_debounce(self.debounce_ms),
            staleness_ms: clamp_staleness(self.staleness_ms),
        }
    }
}

/// Clamp a debounce duration into [10ms, 1000ms]
pub fn clamp_debounce(ms: u64) -> u64 {
    ms.clamp(DEBOUNCE_MIN_MS, DEBOUNCE_MAX_MS)
}

/// Clamp a staleness window into [100ms, 10000ms]
pub fn clamp_staleness(ms: u64) -> u64 {
    ms.clamp(STALENESS_MIN_MS, STALENESS_MAX_MS)
}
