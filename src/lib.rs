//! Circuit breaker with live metrics.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller ──call(work)──▶ CircuitBreaker ──permitted──▶ work()
//!                             │    ▲
//!                  record +   │    │ fail fast (BreakerOpen)
//!                  evaluate   ▼    │
//!                        ┌──────────────┐      ┌──────────────┐
//!                        │ ArcSwap slot │◀─────│ MetricsView  │◀── gauges
//!                        │ (Activation) │ load │ (per read)   │
//!                        └──────────────┘      └──────────────┘
//!                          state + window,
//!                          swapped as one
//! ```
//!
//! - `resilience`: the breaker, its evaluation window, views and registry
//! - `config`: TOML schema, loading and validation
//! - `observability`: logging and Prometheus metrics
//! - `lifecycle`: shutdown of background tasks

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::{AppConfig, BreakerConfig, ConfigError, RegistryConfig};
pub use lifecycle::Shutdown;
pub use resilience::{
    BreakerOpen, BreakerRegistry, CallError, CircuitBreaker, MetricsSnapshot, MetricsView, State,
};
