//! Registry of named circuit breakers.
//!
//! # Responsibilities
//! - Create breakers lazily on first lookup
//! - Apply per-name configuration, falling back to the registry defaults
//! - Hand out shared handles so every caller of a name sees one breaker

use std::sync::Arc;
use dashmap::DashMap;

use crate::config::validation::validate_registry_config;
use crate::config::{ConfigError, RegistryConfig};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::clock::{Clock, SystemClock};

/// Concurrent map of breaker name to breaker.
#[derive(Debug, Clone)]
pub struct BreakerRegistry {
    config: Arc<RegistryConfig>,
    clock: Arc<dyn Clock>,
    breakers: Arc<DashMap<String, CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Build a registry. Every config in `config` is validated up front so
    /// lookups never fail.
    pub fn new(config: RegistryConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RegistryConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        validate_registry_config(&config).map_err(ConfigError::Validation)?;
        Ok(Self {
            config: Arc::new(config),
            clock,
            breakers: Arc::new(DashMap::new()),
        })
    }

    /// Get the breaker called `name`, creating it on first use.
    pub fn breaker(&self, name: &str) -> CircuitBreaker {
        if let Some(existing) = self.breakers.get(name) {
            return existing.clone();
        }
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!(breaker = %name, "Registering circuit breaker");
                CircuitBreaker::from_validated(
                    name.to_string(),
                    self.config.for_breaker(name).clone(),
                    self.clock.clone(),
                )
            })
            .clone()
    }

    /// Get the breaker called `name` only if it already exists.
    pub fn get(&self, name: &str) -> Option<CircuitBreaker> {
        self.breakers.get(name).map(|r| r.value().clone())
    }

    /// Drop `name` from the registry. Existing handles keep working.
    pub fn remove(&self, name: &str) -> Option<CircuitBreaker> {
        self.breakers.remove(name).map(|(_, breaker)| breaker)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.breakers.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Every registered breaker.
    pub fn all(&self) -> Vec<CircuitBreaker> {
        self.breakers.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerConfig;
    use crate::resilience::State;

    #[test]
    fn test_same_name_same_breaker() {
        let registry = BreakerRegistry::new(RegistryConfig::default()).unwrap();
        let a = registry.breaker("payments");
        let b = registry.breaker("payments");

        a.transition_to_forced_open();
        assert_eq!(b.state(), State::ForcedOpen);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_instance_override() {
        let mut config = RegistryConfig::default();
        config.instances.insert(
            "payments".into(),
            BreakerConfig {
                closed_buffer_size: 7,
                ..BreakerConfig::default()
            },
        );
        let registry = BreakerRegistry::new(config).unwrap();

        assert_eq!(registry.breaker("payments").config().closed_buffer_size, 7);
        assert_eq!(registry.breaker("inventory").config().closed_buffer_size, 100);
        assert_eq!(registry.names(), vec!["inventory".to_string(), "payments".to_string()]);
    }

    #[test]
    fn test_get_does_not_create() {
        let registry = BreakerRegistry::new(RegistryConfig::default()).unwrap();
        assert!(registry.get("missing").is_none());
        assert!(registry.is_empty());

        registry.breaker("present");
        assert!(registry.get("present").is_some());
        assert!(registry.remove("present").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RegistryConfig {
            defaults: BreakerConfig {
                failure_rate_threshold: 101.0,
                ..BreakerConfig::default()
            },
            ..RegistryConfig::default()
        };
        assert!(matches!(
            BreakerRegistry::new(config),
            Err(ConfigError::Validation(_))
        ));
    }
}
