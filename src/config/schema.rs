//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files and
//! fall back to defaults for any field left out.

use std::collections::HashMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Logging and metrics exposition settings.
    pub observability: ObservabilityConfig,

    /// Circuit breaker defaults and per-name overrides.
    pub breakers: RegistryConfig,
}

/// Thresholds and buffer sizes for a single circuit breaker.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Failure percentage (0-100) at or above which the breaker opens.
    pub failure_rate_threshold: f32,

    /// Slow-call percentage (0-100) at or above which the breaker opens.
    pub slow_call_rate_threshold: f32,

    /// Calls taking at least this long are classified as slow.
    pub slow_call_duration_threshold_ms: u64,

    /// How long the breaker stays open before letting probe calls through.
    pub wait_duration_in_open_state_ms: u64,

    /// Evaluation window size while closed.
    pub closed_buffer_size: usize,

    /// Number of probe calls evaluated while half-open.
    pub half_open_buffer_size: usize,

    /// Calls required in the closed window before rates are evaluated.
    /// Capped at `closed_buffer_size`.
    pub minimum_calls_before_evaluation: usize,
}

impl BreakerConfig {
    pub fn slow_call_duration_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_call_duration_threshold_ms)
    }

    pub fn wait_duration_in_open_state(&self) -> Duration {
        Duration::from_millis(self.wait_duration_in_open_state_ms)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            slow_call_rate_threshold: 100.0,
            slow_call_duration_threshold_ms: 60_000,
            wait_duration_in_open_state_ms: 60_000,
            closed_buffer_size: 100,
            half_open_buffer_size: 10,
            minimum_calls_before_evaluation: 100,
        }
    }
}

/// Configuration for the breaker registry.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RegistryConfig {
    /// Applied to every breaker without its own entry.
    pub defaults: BreakerConfig,

    /// Per-name configuration, replacing `defaults` entirely for that name.
    pub instances: HashMap<String, BreakerConfig>,
}

impl RegistryConfig {
    /// Configuration for the breaker called `name`.
    pub fn for_breaker(&self, name: &str) -> &BreakerConfig {
        self.instances.get(name).unwrap_or(&self.defaults)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// How often breaker gauges are republished, in milliseconds.
    pub publish_interval_ms: u64,
}

impl ObservabilityConfig {
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
            publish_interval_ms: 1_000,
        }
    }
}
