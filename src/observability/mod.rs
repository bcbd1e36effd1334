//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Circuit breakers produce:
//!     → logging.rs (structured log events for transitions and rejections)
//!     → metrics.rs (call/rejection/transition counters)
//!
//! MetricsPublisher periodically reads every registered breaker's view:
//!     → gauges (buffered calls, rates, state)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Gauges are set from a live view at publish time, never cached
//! - Counters are cheap facade calls, no-ops without an installed recorder

pub mod logging;
pub mod metrics;
