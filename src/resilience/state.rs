//! Circuit breaker states and the activation published for each of them.
//!
//! # States
//! - Closed: normal operation, calls pass through and are recorded
//! - Open: backend assumed down, calls fail fast
//! - Half-Open: a bounded number of probe calls test recovery
//! - Disabled: calls pass through unrecorded, never transitions
//! - Forced-Open: every call rejected until cleared
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure or slow-call rate >= threshold
//! Open → Half-Open: wait duration elapsed (checked on the next call)
//! Half-Open → Closed: probe window full, rates below threshold
//! Half-Open → Open: probe window full, a rate >= threshold
//! Any → Disabled / Forced-Open / ...: administrative only
//! ```
//!
//! Every entry into a state builds a new [`Activation`]. Closed and
//! half-open activations always get a fresh window.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use serde::{Deserialize, Serialize};

use crate::config::BreakerConfig;
use crate::resilience::window::EvaluationWindow;

/// Externally visible circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Closed,
    Open,
    HalfOpen,
    Disabled,
    ForcedOpen,
}

impl State {
    pub const ALL: [State; 5] = [
        State::Closed,
        State::Open,
        State::HalfOpen,
        State::Disabled,
        State::ForcedOpen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half_open",
            State::Disabled => "disabled",
            State::ForcedOpen => "forced_open",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) type SharedWindow = Arc<Mutex<EvaluationWindow>>;

pub(crate) fn fresh_closed_window(config: &BreakerConfig) -> SharedWindow {
    Arc::new(Mutex::new(EvaluationWindow::new(
        config.closed_buffer_size,
        config.minimum_calls_before_evaluation,
    )))
}

pub(crate) fn lock_window(window: &Mutex<EvaluationWindow>) -> MutexGuard<'_, EvaluationWindow> {
    window.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Data carried by each state.
pub(crate) enum Phase {
    Closed {
        window: SharedWindow,
    },
    Open {
        opened_at: Instant,
        /// Window that tripped the breaker. Read-only from here on.
        tripped: SharedWindow,
    },
    HalfOpen {
        window: SharedWindow,
        /// Probe calls handed out so far.
        permits: AtomicUsize,
    },
    Disabled,
    ForcedOpen,
}

/// One entry into a state, published atomically as a unit.
pub(crate) struct Activation {
    pub(crate) phase: Phase,
    /// Calls rejected while this activation was current.
    pub(crate) rejected: AtomicU64,
}

impl Activation {
    fn with_phase(phase: Phase) -> Self {
        Self {
            phase,
            rejected: AtomicU64::new(0),
        }
    }

    pub(crate) fn closed(config: &BreakerConfig) -> Self {
        Self::with_phase(Phase::Closed {
            window: fresh_closed_window(config),
        })
    }

    /// Probe window is evaluated only once it is full.
    pub(crate) fn half_open(config: &BreakerConfig) -> Self {
        let window = EvaluationWindow::new(
            config.half_open_buffer_size,
            config.half_open_buffer_size,
        );
        Self::with_phase(Phase::HalfOpen {
            window: Arc::new(Mutex::new(window)),
            permits: AtomicUsize::new(0),
        })
    }

    pub(crate) fn open(opened_at: Instant, tripped: SharedWindow) -> Self {
        Self::with_phase(Phase::Open { opened_at, tripped })
    }

    pub(crate) fn disabled() -> Self {
        Self::with_phase(Phase::Disabled)
    }

    pub(crate) fn forced_open() -> Self {
        Self::with_phase(Phase::ForcedOpen)
    }

    pub(crate) fn state(&self) -> State {
        match self.phase {
            Phase::Closed { .. } => State::Closed,
            Phase::Open { .. } => State::Open,
            Phase::HalfOpen { .. } => State::HalfOpen,
            Phase::Disabled => State::Disabled,
            Phase::ForcedOpen => State::ForcedOpen,
        }
    }

    pub(crate) fn opened_at(&self) -> Option<Instant> {
        match self.phase {
            Phase::Open { opened_at, .. } => Some(opened_at),
            _ => None,
        }
    }

    /// Window reported by metrics views.
    pub(crate) fn window(&self) -> Option<&SharedWindow> {
        match &self.phase {
            Phase::Closed { window } | Phase::HalfOpen { window, .. } => Some(window),
            Phase::Open { tripped, .. } => Some(tripped),
            Phase::Disabled | Phase::ForcedOpen => None,
        }
    }

    /// Window that accepts new outcomes.
    pub(crate) fn recording_window(&self) -> Option<&SharedWindow> {
        match &self.phase {
            Phase::Closed { window } | Phase::HalfOpen { window, .. } => Some(window),
            _ => None,
        }
    }

    pub(crate) fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Hand back a half-open probe permit that was never used.
    pub(crate) fn release_permit(&self) {
        if let Phase::HalfOpen { permits, .. } = &self.phase {
            let _ = permits.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_activation_gets_its_own_window() {
        let config = BreakerConfig::default();
        let first = Activation::closed(&config);
        let second = Activation::closed(&config);
        let (a, b) = (first.window().unwrap(), second.window().unwrap());
        assert!(!Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_half_open_window_sized_for_probes() {
        let config = BreakerConfig {
            half_open_buffer_size: 3,
            ..BreakerConfig::default()
        };
        let activation = Activation::half_open(&config);
        let window = lock_window(activation.window().unwrap());
        assert_eq!(window.capacity(), 3);
        assert_eq!(window.minimum_calls(), 3);
    }

    #[test]
    fn test_open_reports_but_does_not_record() {
        let config = BreakerConfig::default();
        let closed = Activation::closed(&config);
        let tripped = closed.window().unwrap().clone();
        let open = Activation::open(Instant::now(), tripped.clone());

        assert_eq!(open.state(), State::Open);
        assert!(Arc::ptr_eq(open.window().unwrap(), &tripped));
        assert!(open.recording_window().is_none());
        assert!(Activation::forced_open().window().is_none());
    }

    #[test]
    fn test_release_permit_saturates() {
        let activation = Activation::half_open(&BreakerConfig::default());
        activation.release_permit();
        if let Phase::HalfOpen { permits, .. } = &activation.phase {
            assert_eq!(permits.load(Ordering::Relaxed), 0);
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(State::HalfOpen.to_string(), "half_open");
        assert_eq!(State::ALL.len(), 5);
    }
}
