//! Live, read-only metrics over a circuit breaker.
//!
//! A [`MetricsView`] holds the breaker's activation slot, not a window.
//! Every read loads whatever activation is current at that moment, so a
//! view created once keeps reporting the right window across any number of
//! state transitions.

use std::sync::Arc;
use arc_swap::ArcSwap;
use serde::Serialize;

use crate::resilience::state::{lock_window, Activation, State};
use crate::resilience::window::EvaluationWindow;

/// Read-only accessor for a breaker's current counts.
#[derive(Clone)]
pub struct MetricsView {
    name: Arc<str>,
    slot: Arc<ArcSwap<Activation>>,
}

impl MetricsView {
    pub(crate) fn new(name: Arc<str>, slot: Arc<ArcSwap<Activation>>) -> Self {
        Self { name, slot }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> State {
        self.slot.load().state()
    }

    /// Failed calls in the current window, slow ones excluded.
    pub fn failed(&self) -> usize {
        self.read_window(EvaluationWindow::failure_count)
    }

    /// Successful calls in the current window, slow ones excluded.
    pub fn successful(&self) -> usize {
        self.read_window(EvaluationWindow::success_count)
    }

    /// Slow calls in the current window, whatever their result.
    pub fn slow(&self) -> usize {
        self.read_window(EvaluationWindow::slow_count)
    }

    /// Calls rejected since the current state was entered.
    pub fn rejected(&self) -> u64 {
        self.slot.load().rejected()
    }

    pub fn buffered(&self) -> usize {
        self.read_window(EvaluationWindow::buffered)
    }

    /// Capacity of the current window, zero when there is none.
    pub fn max_buffered(&self) -> usize {
        self.read_window(EvaluationWindow::capacity)
    }

    pub fn failure_rate(&self) -> Option<f32> {
        self.read_window(EvaluationWindow::failure_rate)
    }

    pub fn slow_call_rate(&self) -> Option<f32> {
        self.read_window(EvaluationWindow::slow_call_rate)
    }

    /// All counters taken from a single activation.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let activation = self.slot.load();
        let mut snapshot = MetricsSnapshot {
            name: self.name.to_string(),
            state: activation.state(),
            rejected: activation.rejected(),
            ..MetricsSnapshot::default()
        };
        if let Some(window) = activation.window() {
            let window = lock_window(window);
            snapshot.failed = window.failure_count();
            snapshot.successful = window.success_count();
            snapshot.slow = window.slow_count();
            snapshot.buffered = window.buffered();
            snapshot.max_buffered = window.capacity();
            snapshot.failure_rate = window.failure_rate();
            snapshot.slow_call_rate = window.slow_call_rate();
        }
        snapshot
    }

    fn read_window<R: Default>(&self, read: impl FnOnce(&EvaluationWindow) -> R) -> R {
        let activation = self.slot.load();
        match activation.window() {
            Some(window) => {
                let window = lock_window(window);
                read(&*window)
            }
            None => R::default(),
        }
    }
}

impl std::fmt::Debug for MetricsView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsView")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Point-in-time copy of a breaker's metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub name: String,
    pub state: State,
    pub failed: usize,
    pub successful: usize,
    pub slow: usize,
    pub rejected: u64,
    pub buffered: usize,
    pub max_buffered: usize,
    pub failure_rate: Option<f32>,
    pub slow_call_rate: Option<f32>,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            name: String::new(),
            state: State::Closed,
            failed: 0,
            successful: 0,
            slow: 0,
            rejected: 0,
            buffered: 0,
            max_buffered: 0,
            failure_rate: None,
            slow_call_rate: None,
        }
    }
}
