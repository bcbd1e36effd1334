//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Protected call:
//!     → circuit_breaker.rs (permission, run, record, evaluate)
//!     → window.rs (ring of outcomes, failure/slow rates)
//!     → state.rs (activation swapped atomically on each transition)
//!     → view.rs (metrics read through the live activation)
//!
//! Named breakers:
//!     → registry.rs (lazily created, shared by name)
//! ```
//!
//! # Design Decisions
//! - One fresh window per closed/half-open activation
//! - Metrics views resolve the current activation on every read
//! - Rejections fail fast and are never recorded into a window
//! - Retrying is the caller's business; backoff.rs is a helper for that

pub mod backoff;
pub mod circuit_breaker;
pub mod clock;
pub mod error;
pub mod registry;
pub mod state;
pub mod view;
pub mod window;

pub use backoff::Backoff;
pub use circuit_breaker::{CircuitBreaker, StateTransition};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BreakerOpen, CallError};
pub use registry::BreakerRegistry;
pub use state::State;
pub use view::{MetricsSnapshot, MetricsView};
pub use window::{EvaluationWindow, Outcome, OutcomeKind};
