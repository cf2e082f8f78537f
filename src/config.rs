//! Bridge configuration
//!
//! Every knob has a default; a YAML file only needs the fields it changes.
//! Durations are given in milliseconds.

use crate::classify::DEFAULT_ERROR_DEDUPE_WINDOW;
use crate::error::BridgeResult;
use crate::handshake::{DEFAULT_PROBE_ATTEMPTS, DEFAULT_PROBE_INTERVAL};
use crate::progress::ProgressTiming;
use crate::session::DEFAULT_CORRELATION_CAPACITY;
use crate::transfer::DEFAULT_TRANSFER_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Files up to this many bytes travel inline; larger ones by reference.
    pub transfer_threshold: u64,
    pub probe_interval_ms: u64,
    pub probe_attempts: u32,
    pub frame_load_timeout_ms: u64,
    /// Force the transfer this long after the frame loads if the engine has
    /// not answered the handshake.
    pub fallback_delay_ms: u64,
    pub legacy_fallback: bool,
    pub engine_ready_timeout_ms: u64,
    pub load_timeout_ms: u64,
    pub correlation_capacity: usize,
    pub progress_start_delay_ms: u64,
    pub progress_tick_ms: u64,
    pub progress_ease_ms: u64,
    pub cache_write_delay_ms: u64,
    pub error_dedupe_window_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let progress = ProgressTiming::default();
        Self {
            transfer_threshold: DEFAULT_TRANSFER_THRESHOLD,
            probe_interval_ms: millis(DEFAULT_PROBE_INTERVAL),
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            frame_load_timeout_ms: 15_000,
            fallback_delay_ms: 1_500,
            legacy_fallback: true,
            engine_ready_timeout_ms: 12_000,
            load_timeout_ms: 60_000,
            correlation_capacity: DEFAULT_CORRELATION_CAPACITY,
            progress_start_delay_ms: millis(progress.start_delay),
            progress_tick_ms: millis(progress.tick),
            progress_ease_ms: millis(progress.ease),
            cache_write_delay_ms: 500,
            error_dedupe_window_ms: millis(DEFAULT_ERROR_DEDUPE_WINDOW),
        }
    }
}

impl BridgeConfig {
    pub fn from_yaml_str(text: &str) -> BridgeResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> BridgeResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn frame_load_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_load_timeout_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn engine_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.engine_ready_timeout_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn cache_write_delay(&self) -> Duration {
        Duration::from_millis(self.cache_write_delay_ms)
    }

    pub fn error_dedupe_window(&self) -> Duration {
        Duration::from_millis(self.error_dedupe_window_ms)
    }

    pub fn progress_timing(&self) -> ProgressTiming {
        ProgressTiming {
            start_delay: Duration::from_millis(self.progress_start_delay_ms),
            tick: Duration::from_millis(self.progress_tick_ms),
            ease: Duration::from_millis(self.progress_ease_ms),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = BridgeConfig::default();
        assert_eq!(config.transfer_threshold, 32 * 1024 * 1024);
        assert_eq!(config.probe_interval(), Duration::from_secs(1));
        assert_eq!(config.probe_attempts, 10);
        assert_eq!(config.fallback_delay(), Duration::from_millis(1500));
        assert_eq!(config.engine_ready_timeout(), Duration::from_secs(12));
        assert_eq!(config.frame_load_timeout(), Duration::from_secs(15));
        assert_eq!(config.load_timeout(), Duration::from_secs(60));
        assert_eq!(config.correlation_capacity, 24);
        assert_eq!(config.progress_timing(), ProgressTiming::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = BridgeConfig::from_yaml_str(
            "transfer_threshold: 1024\nlegacy_fallback: false\nload_timeout_ms: 5000\n",
        )
        .unwrap();
        assert_eq!(config.transfer_threshold, 1024);
        assert!(!config.legacy_fallback);
        assert_eq!(config.load_timeout(), Duration::from_secs(5));
        assert_eq!(config.probe_attempts, 10);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(BridgeConfig::from_yaml_str("  \n").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn yaml_round_trip() {
        let config = BridgeConfig {
            probe_attempts: 3,
            ..BridgeConfig::default()
        };
        let text = config.to_yaml().unwrap();
        assert_eq!(BridgeConfig::from_yaml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.yaml");
        std::fs::write(&path, "probe_attempts: 2\n").unwrap();
        assert_eq!(BridgeConfig::load(&path).unwrap().probe_attempts, 2);
    }

    #[test]
    fn malformed_yaml_is_config_error() {
        let err = BridgeConfig::from_yaml_str("probe_attempts: [").unwrap_err();
        assert!(matches!(err, crate::error::BridgeError::Config(_)));
    }
}
