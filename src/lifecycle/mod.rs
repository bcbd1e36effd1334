//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscribed background task exits its loop
//!
//! Signals (signals.rs):
//!     SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Background tasks (metrics publishing) own a broadcast receiver
//! - Circuit breakers need no teardown; they hold no tasks or timers

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
