//! Configuration structures.
//!
//! Configuration is loaded from environment variables and config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Worker channel configuration.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Media preparation configuration.
    #[serde(default)]
    pub media: MediaConfig,

    /// Input fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Worker channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Bounded channel capacity for task events (log/progress/terminal).
    pub event_channel_capacity: usize,

    /// Grace period to wait for a cancelled worker to wind down before the
    /// handle is aborted outright.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 64,
            shutdown_grace: Duration::from_millis(250),
        }
    }
}

/// Media preparation configuration.
///
/// Recognition and transcription engines assume a fixed sample shape; the
/// caller-side decode step converts into it before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Target sample rate for prepared audio (Hz).
    pub target_sample_rate: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16_000,
        }
    }
}

/// Input fetch configuration (URL sources).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Overall timeout for fetching a URL input.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Maximum accepted input payload in bytes.
    pub max_input_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_input_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.worker.event_channel_capacity, 64);
        assert_eq!(config.media.target_sample_rate, 16_000);
        assert!(config.fetch.max_input_bytes > 0);
    }

    #[test]
    fn deserializes_from_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{"media": {"target_sample_rate": 22050}}"#).unwrap();
        assert_eq!(config.media.target_sample_rate, 22_050);
        // Untouched sections fall back to defaults
        assert_eq!(config.worker.event_channel_capacity, 64);
    }

    #[test]
    fn humantime_durations_parse() {
        let config: Config =
            serde_json::from_str(r#"{"fetch": {"timeout": "2m", "max_input_bytes": 1024}}"#)
                .unwrap();
        assert_eq!(config.fetch.timeout, Duration::from_secs(120));
        assert_eq!(config.fetch.max_input_bytes, 1024);
    }
}
