//! Circuit breaker for protecting fallible work.
//!
//! # Data Flow
//! ```text
//! call(work)
//!     → acquire permission (lock-free unless an open wait just expired)
//!     → run work, time it
//!     → under the breaker lock: record into the current window,
//!       evaluate thresholds, maybe publish a new activation
//! ```
//!
//! # Design Decisions
//! - The active state and its window are published together in one
//!   `ArcSwap` slot, so readers never pair a window with the wrong state
//! - Record + evaluate + publish are serialised by one mutex, so a threshold
//!   crossing produces exactly one transition
//! - Open-state expiry is evaluated lazily on call attempts, no timer task
//! - Outcomes landing while open, forced-open or disabled are dropped

use std::fmt;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::validation::validate_breaker_config;
use crate::config::{BreakerConfig, ConfigError};
use crate::observability::metrics;
use crate::resilience::clock::{Clock, SystemClock};
use crate::resilience::error::{BreakerOpen, CallError};
use crate::resilience::state::{fresh_closed_window, lock_window, Activation, Phase, State};
use crate::resilience::view::MetricsView;
use crate::resilience::window::Outcome;

const EVENT_CAPACITY: usize = 64;

/// Emitted on every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub breaker: String,
    pub from: State,
    pub to: State,
}

/// A shareable circuit breaker. Clones refer to the same breaker.
#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
}

struct Inner {
    name: Arc<str>,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    slot: Arc<ArcSwap<Activation>>,
    transition_lock: Mutex<()>,
    events: broadcast::Sender<StateTransition>,
}

/// Permission to run one call.
enum Permit {
    /// Outcome goes into whichever window is current on completion.
    Recorded(Arc<Activation>),
    /// Disabled breaker; nothing is recorded.
    Unrecorded,
}

impl CircuitBreaker {
    /// Create a closed breaker using the system clock.
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Result<Self, ConfigError> {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    /// Create a closed breaker with an explicit time source.
    pub fn with_clock(
        name: impl Into<String>,
        config: BreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        validate_breaker_config(&config).map_err(ConfigError::Validation)?;
        Ok(Self::from_validated(name.into(), config, clock))
    }

    pub(crate) fn from_validated(name: String, config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let slot = Arc::new(ArcSwap::from_pointee(Activation::closed(&config)));
        tracing::debug!(breaker = %name, ?config, "Circuit breaker created");
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                config,
                clock,
                slot,
                transition_lock: Mutex::new(()),
                events,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.inner.config
    }

    /// Currently published state. An open breaker whose wait has elapsed
    /// reports `Open` until the next call attempt moves it to half-open.
    pub fn state(&self) -> State {
        self.inner.slot.load().state()
    }

    /// Live metrics bound to this breaker's current window.
    pub fn metrics(&self) -> MetricsView {
        MetricsView::new(self.inner.name.clone(), self.inner.slot.clone())
    }

    /// Receive every subsequent state transition.
    pub fn subscribe(&self) -> broadcast::Receiver<StateTransition> {
        self.inner.events.subscribe()
    }

    /// Run `work` if the breaker permits it, recording its outcome.
    ///
    /// The work's error is returned unchanged inside [`CallError::Failed`]
    /// after being recorded as a failure.
    pub fn call<T, E, F>(&self, work: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let guard = self.start_call()?;
        let result = work();
        guard.complete(result.is_ok());
        result.map_err(CallError::Failed)
    }

    /// Async version of [`call`](Self::call). Dropping the future before it
    /// completes records nothing and returns any half-open permit.
    pub async fn call_async<T, E, F, Fut>(&self, work: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let guard = self.start_call()?;
        let result = work().await;
        guard.complete(result.is_ok());
        result.map_err(CallError::Failed)
    }

    fn start_call(&self) -> Result<CallGuard<'_>, BreakerOpen> {
        let permit = self.acquire_permission()?;
        Ok(CallGuard {
            breaker: self,
            permit: Some(permit),
            started: self.inner.clock.now(),
        })
    }

    fn acquire_permission(&self) -> Result<Permit, BreakerOpen> {
        let current = self.inner.slot.load_full();
        match current.opened_at() {
            None => self.permit_for(current),
            Some(opened_at) if !self.wait_elapsed(opened_at) => Err(self.reject(&current)),
            Some(_) => {
                drop(current);
                self.enter_half_open_after_wait()
            }
        }
    }

    /// Runs under the transition lock so only one caller performs the
    /// open → half-open move.
    fn enter_half_open_after_wait(&self) -> Result<Permit, BreakerOpen> {
        let _guard = self.lock();
        let current = self.inner.slot.load_full();
        match current.opened_at() {
            Some(opened_at) if !self.wait_elapsed(opened_at) => Err(self.reject(&current)),
            Some(_) => {
                self.publish(Activation::half_open(&self.inner.config));
                self.permit_for(self.inner.slot.load_full())
            }
            // Another caller already moved on.
            None => self.permit_for(current),
        }
    }

    fn permit_for(&self, current: Arc<Activation>) -> Result<Permit, BreakerOpen> {
        let permitted = match &current.phase {
            Phase::Closed { .. } => true,
            Phase::Disabled => return Ok(Permit::Unrecorded),
            Phase::HalfOpen { permits, .. } => {
                let limit = self.inner.config.half_open_buffer_size;
                permits
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < limit).then_some(n + 1))
                    .is_ok()
            }
            // Raced with another caller re-opening the breaker.
            Phase::Open { .. } | Phase::ForcedOpen => false,
        };
        if permitted {
            Ok(Permit::Recorded(current))
        } else {
            Err(self.reject(&current))
        }
    }

    fn wait_elapsed(&self, opened_at: Instant) -> bool {
        let now = self.inner.clock.now();
        now.saturating_duration_since(opened_at) >= self.inner.config.wait_duration_in_open_state()
    }

    fn reject(&self, activation: &Activation) -> BreakerOpen {
        activation.rejected.fetch_add(1, Ordering::Relaxed);
        let state = activation.state();
        metrics::record_rejected(&self.inner.name, state);
        tracing::debug!(breaker = %self.inner.name, state = %state, "Call not permitted");
        BreakerOpen {
            name: self.inner.name.to_string(),
            state,
        }
    }

    fn on_outcome(&self, outcome: Outcome) {
        metrics::record_call(&self.inner.name, outcome);

        let _guard = self.lock();
        let current = self.inner.slot.load_full();
        let Some(window) = current.recording_window() else {
            tracing::debug!(
                breaker = %self.inner.name,
                state = %current.state(),
                outcome = outcome.kind().as_str(),
                "Outcome arrived after the breaker left its recording state, dropped"
            );
            return;
        };

        let (failure_rate, slow_call_rate) = {
            let mut window = lock_window(window);
            window.record(outcome);
            (window.failure_rate(), window.slow_call_rate())
        };

        let config = &self.inner.config;
        let exceeded = failure_rate.is_some_and(|rate| rate >= config.failure_rate_threshold)
            || slow_call_rate.is_some_and(|rate| rate >= config.slow_call_rate_threshold);

        match &current.phase {
            Phase::Closed { window } if exceeded => {
                tracing::warn!(
                    breaker = %self.inner.name,
                    failure_rate = ?failure_rate,
                    slow_call_rate = ?slow_call_rate,
                    "Threshold exceeded, opening circuit"
                );
                self.publish(Activation::open(self.inner.clock.now(), window.clone()));
            }
            // The probe window only yields rates once it is full.
            Phase::HalfOpen { window, .. } if failure_rate.is_some() => {
                if exceeded {
                    self.publish(Activation::open(self.inner.clock.now(), window.clone()));
                } else {
                    self.publish(Activation::closed(config));
                }
            }
            _ => {}
        }
    }

    // --- Administrative transitions ---

    /// Close with a fresh window.
    pub fn transition_to_closed(&self) {
        let _guard = self.lock();
        self.publish(Activation::closed(&self.inner.config));
    }

    /// Open now, keeping the current window (if any) for reporting.
    pub fn transition_to_open(&self) {
        let _guard = self.lock();
        let tripped = match self.inner.slot.load().window() {
            Some(window) => window.clone(),
            None => fresh_closed_window(&self.inner.config),
        };
        self.publish(Activation::open(self.inner.clock.now(), tripped));
    }

    /// Start probing immediately with a fresh half-open window.
    pub fn transition_to_half_open(&self) {
        let _guard = self.lock();
        self.publish(Activation::half_open(&self.inner.config));
    }

    /// Let every call through without recording, until changed.
    pub fn transition_to_disabled(&self) {
        let _guard = self.lock();
        self.publish(Activation::disabled());
    }

    /// Reject every call, until changed.
    pub fn transition_to_forced_open(&self) {
        let _guard = self.lock();
        self.publish(Activation::forced_open());
    }

    /// Return to a fresh closed state, discarding all history.
    pub fn reset(&self) {
        tracing::info!(breaker = %self.inner.name, "Circuit breaker reset");
        self.transition_to_closed();
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.transition_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in `next`. Callers hold the transition lock.
    fn publish(&self, next: Activation) {
        let to = next.state();
        let from = self.inner.slot.swap(Arc::new(next)).state();

        tracing::info!(breaker = %self.inner.name, from = %from, to = %to, "Circuit breaker state transition");
        metrics::record_state_transition(&self.inner.name, from, to);
        let _ = self.inner.events.send(StateTransition {
            breaker: self.inner.name.to_string(),
            from,
            to,
        });
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Tracks one permitted call. Records on `complete`; if dropped first, the
/// call is treated as abandoned.
struct CallGuard<'a> {
    breaker: &'a CircuitBreaker,
    permit: Option<Permit>,
    started: Instant,
}

impl CallGuard<'_> {
    fn complete(mut self, succeeded: bool) {
        if let Some(Permit::Recorded(_)) = self.permit.take() {
            let inner = &self.breaker.inner;
            let elapsed = inner.clock.now().saturating_duration_since(self.started);
            let outcome = Outcome::classify(succeeded, elapsed, inner.config.slow_call_duration_threshold());
            self.breaker.on_outcome(outcome);
        }
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if let Some(Permit::Recorded(activation)) = self.permit.take() {
            activation.release_permit();
        }
    }
}
