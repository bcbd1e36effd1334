//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (buffer sizes > 0, percentages within [0, 100])
//! - Check the metrics address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: config → Result<(), Vec<ValidationError>>
//! - Runs before a breaker or registry is built, never at call time

use std::net::SocketAddr;
use crate::config::schema::{AppConfig, BreakerConfig, RegistryConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: String },

    #[error("{field} must be within [0, 100], got {value}")]
    OutOfRange { field: String, value: f32 },

    #[error("{field} is not a valid socket address: '{value}'")]
    InvalidAddress { field: String, value: String },
}

/// Validate a single breaker configuration.
pub fn validate_breaker_config(config: &BreakerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_breaker("", config, &mut errors);
    into_result(errors)
}

/// Validate the registry defaults and every named instance.
pub fn validate_registry_config(config: &RegistryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_registry(config, &mut errors);
    into_result(errors)
}

/// Validate a full application configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_registry(&config.breakers, &mut errors);

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address".to_string(),
            value: observability.metrics_address.clone(),
        });
    }
    if observability.publish_interval_ms == 0 {
        errors.push(ValidationError::NotPositive {
            field: "observability.publish_interval_ms".to_string(),
        });
    }

    into_result(errors)
}

fn check_registry(config: &RegistryConfig, errors: &mut Vec<ValidationError>) {
    check_breaker("breakers.defaults.", &config.defaults, errors);

    // Sorted so error order is stable across runs.
    let mut names: Vec<_> = config.instances.keys().collect();
    names.sort();
    for name in names {
        let prefix = format!("breakers.instances.{}.", name);
        check_breaker(&prefix, &config.instances[name], errors);
    }
}

fn check_breaker(prefix: &str, config: &BreakerConfig, errors: &mut Vec<ValidationError>) {
    let percentages = [
        ("failure_rate_threshold", config.failure_rate_threshold),
        ("slow_call_rate_threshold", config.slow_call_rate_threshold),
    ];
    for (name, value) in percentages {
        // Also rejects NaN.
        if !(0.0..=100.0).contains(&value) {
            errors.push(ValidationError::OutOfRange {
                field: format!("{}{}", prefix, name),
                value,
            });
        }
    }

    let sizes = [
        ("closed_buffer_size", config.closed_buffer_size),
        ("half_open_buffer_size", config.half_open_buffer_size),
    ];
    for (name, value) in sizes {
        if value == 0 {
            errors.push(ValidationError::NotPositive {
                field: format!("{}{}", prefix, name),
            });
        }
    }
}

fn into_result(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
        assert!(validate_breaker_config(&BreakerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let config = BreakerConfig {
            failure_rate_threshold: 120.0,
            slow_call_rate_threshold: f32::NAN,
            closed_buffer_size: 0,
            half_open_buffer_size: 0,
            ..BreakerConfig::default()
        };

        let errors = validate_breaker_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(
            errors[0],
            ValidationError::OutOfRange {
                field: "failure_rate_threshold".into(),
                value: 120.0
            }
        );
        assert!(errors.contains(&ValidationError::NotPositive {
            field: "half_open_buffer_size".into()
        }));
    }

    #[test]
    fn test_instance_errors_are_prefixed() {
        let mut config = AppConfig::default();
        config.breakers.instances.insert(
            "payments".into(),
            BreakerConfig {
                closed_buffer_size: 0,
                ..BreakerConfig::default()
            },
        );
        config.observability.metrics_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::NotPositive {
                    field: "breakers.instances.payments.closed_buffer_size".into()
                },
                ValidationError::InvalidAddress {
                    field: "observability.metrics_address".into(),
                    value: "not-an-address".into()
                },
            ]
        );
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_enabled = false;
        config.observability.metrics_address = String::new();
        assert!(validate_config(&config).is_ok());
    }
}
