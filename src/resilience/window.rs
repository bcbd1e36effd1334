//! Evaluation window: a fixed-capacity ring of recent call outcomes.
//!
//! # Responsibilities
//! - Keep the last N outcomes, overwriting the oldest once full
//! - Maintain running per-kind counts so rates are O(1)
//! - Withhold rates until enough calls are buffered
//!
//! # Counting
//! ```text
//! Success      → successful
//! Failure      → failed
//! SlowSuccess  → slow
//! SlowFailure  → slow, and toward the failure rate
//! ```
//!
//! The three reported buckets are disjoint: `failed + successful + slow`
//! equals the number of buffered calls.

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Classification of a completed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Failure,
    SlowSuccess,
    SlowFailure,
}

impl OutcomeKind {
    fn index(self) -> usize {
        match self {
            OutcomeKind::Success => 0,
            OutcomeKind::Failure => 1,
            OutcomeKind::SlowSuccess => 2,
            OutcomeKind::SlowFailure => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Failure => "failure",
            OutcomeKind::SlowSuccess => "slow_success",
            OutcomeKind::SlowFailure => "slow_failure",
        }
    }
}

/// Result of one protected call, created when the call completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    kind: OutcomeKind,
    elapsed: Duration,
}

impl Outcome {
    pub fn new(kind: OutcomeKind, elapsed: Duration) -> Self {
        Self { kind, elapsed }
    }

    /// Classify a call by result and duration. A call taking longer than
    /// `slow_threshold` is slow.
    pub fn classify(succeeded: bool, elapsed: Duration, slow_threshold: Duration) -> Self {
        let kind = match (succeeded, elapsed > slow_threshold) {
            (true, false) => OutcomeKind::Success,
            (true, true) => OutcomeKind::SlowSuccess,
            (false, false) => OutcomeKind::Failure,
            (false, true) => OutcomeKind::SlowFailure,
        };
        Self { kind, elapsed }
    }

    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Ring buffer of the last `capacity` outcomes.
#[derive(Debug, Clone)]
pub struct EvaluationWindow {
    slots: Box<[Option<Outcome>]>,
    /// Index the next record overwrites.
    next: usize,
    buffered: usize,
    /// Buffered outcomes per kind, indexed by `OutcomeKind::index`.
    counts: [usize; 4],
    minimum_calls: usize,
}

impl EvaluationWindow {
    /// Create an empty window.
    ///
    /// Rates stay `None` until `min(minimum_calls, capacity)` outcomes are
    /// buffered. A zero capacity is treated as one; configuration validation
    /// rejects it before it gets here.
    pub fn new(capacity: usize, minimum_calls: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            next: 0,
            buffered: 0,
            counts: [0; 4],
            minimum_calls: minimum_calls.clamp(1, capacity),
        }
    }

    /// Append an outcome, evicting the oldest when full.
    pub fn record(&mut self, outcome: Outcome) {
        match self.slots[self.next].replace(outcome) {
            Some(evicted) => self.counts[evicted.kind().index()] -= 1,
            None => self.buffered += 1,
        }
        self.counts[outcome.kind().index()] += 1;
        self.next = (self.next + 1) % self.slots.len();
    }

    fn count_of(&self, kind: OutcomeKind) -> usize {
        self.counts[kind.index()]
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn buffered(&self) -> usize {
        self.buffered
    }

    pub fn is_full(&self) -> bool {
        self.buffered == self.slots.len()
    }

    pub fn minimum_calls(&self) -> usize {
        self.minimum_calls
    }

    /// Failed calls that were not slow.
    pub fn failure_count(&self) -> usize {
        self.count_of(OutcomeKind::Failure)
    }

    /// Successful calls that were not slow.
    pub fn success_count(&self) -> usize {
        self.count_of(OutcomeKind::Success)
    }

    /// Slow calls, whether they succeeded or failed.
    pub fn slow_count(&self) -> usize {
        self.count_of(OutcomeKind::SlowSuccess) + self.count_of(OutcomeKind::SlowFailure)
    }

    /// Failure percentage over buffered calls, slow failures included.
    /// `None` below the minimum.
    pub fn failure_rate(&self) -> Option<f32> {
        self.rate(self.count_of(OutcomeKind::Failure) + self.count_of(OutcomeKind::SlowFailure))
    }

    /// Slow-call percentage over buffered calls, `None` below the minimum.
    pub fn slow_call_rate(&self) -> Option<f32> {
        self.rate(self.slow_count())
    }

    fn rate(&self, count: usize) -> Option<f32> {
        if self.buffered < self.minimum_calls {
            return None;
        }
        Some(count as f32 * 100.0 / self.buffered as f32)
    }

    /// Buffered outcomes, oldest first.
    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> + '_ {
        let (newer, older) = self.slots.split_at(self.next);
        older.iter().chain(newer.iter()).flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kind: OutcomeKind) -> Outcome {
        Outcome::new(kind, Duration::from_millis(5))
    }

    #[test]
    fn test_classify() {
        let slow = Duration::from_millis(100);
        assert_eq!(Outcome::classify(true, Duration::from_millis(10), slow).kind(), OutcomeKind::Success);
        assert_eq!(Outcome::classify(true, slow, slow).kind(), OutcomeKind::Success);
        assert_eq!(Outcome::classify(true, Duration::from_millis(101), slow).kind(), OutcomeKind::SlowSuccess);
        assert_eq!(Outcome::classify(false, slow, slow).kind(), OutcomeKind::Failure);
        assert_eq!(Outcome::classify(true, Duration::ZERO, Duration::ZERO).kind(), OutcomeKind::Success);
        assert_eq!(Outcome::classify(false, Duration::from_secs(1), slow).kind(), OutcomeKind::SlowFailure);
    }

    #[test]
    fn test_rate_withheld_below_minimum() {
        let mut window = EvaluationWindow::new(10, 4);
        for _ in 0..3 {
            window.record(outcome(OutcomeKind::Failure));
        }
        assert_eq!(window.failure_rate(), None);
        assert_eq!(window.failure_count(), 3);

        window.record(outcome(OutcomeKind::Success));
        assert_eq!(window.failure_rate(), Some(75.0));
    }

    #[test]
    fn test_minimum_capped_at_capacity() {
        let mut window = EvaluationWindow::new(2, 100);
        assert_eq!(window.minimum_calls(), 2);
        window.record(outcome(OutcomeKind::Failure));
        window.record(outcome(OutcomeKind::Failure));
        assert_eq!(window.failure_rate(), Some(100.0));
    }

    #[test]
    fn test_empty_window_has_no_rate() {
        let window = EvaluationWindow::new(5, 0);
        assert_eq!(window.failure_rate(), None);
        assert_eq!(window.slow_call_rate(), None);
        assert_eq!(window.buffered(), 0);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut window = EvaluationWindow::new(3, 1);
        window.record(outcome(OutcomeKind::Failure));
        window.record(outcome(OutcomeKind::SlowFailure));
        window.record(outcome(OutcomeKind::Success));
        assert_eq!(window.failure_count(), 1);
        assert_eq!(window.slow_count(), 1);
        assert_eq!(window.failure_rate(), Some(200.0 / 3.0));

        // Pushes out the plain failure.
        window.record(outcome(OutcomeKind::SlowSuccess));
        assert_eq!(window.failure_count(), 0);
        assert_eq!(window.slow_count(), 2);

        // Pushes out the slow failure.
        window.record(outcome(OutcomeKind::Success));
        assert_eq!(window.slow_count(), 1);
        assert_eq!(window.success_count(), 2);
        assert_eq!(window.failure_rate(), Some(0.0));

        let kinds: Vec<_> = window.outcomes().map(|o| o.kind()).collect();
        assert_eq!(
            kinds,
            vec![OutcomeKind::Success, OutcomeKind::SlowSuccess, OutcomeKind::Success]
        );
    }

    #[test]
    fn test_counts_never_exceed_capacity() {
        let kinds = [
            OutcomeKind::Success,
            OutcomeKind::Failure,
            OutcomeKind::SlowSuccess,
            OutcomeKind::SlowFailure,
            OutcomeKind::Failure,
        ];
        let mut window = EvaluationWindow::new(4, 1);
        for i in 0..37 {
            window.record(outcome(kinds[(i * 7) % kinds.len()]));
            let reported = window.failure_count() + window.success_count() + window.slow_count();
            assert_eq!(reported, window.buffered());
            assert!(reported <= window.capacity());
        }
        assert!(window.is_full());
        assert_eq!(window.outcomes().count(), 4);
    }

    #[test]
    fn test_slow_call_rate() {
        let mut window = EvaluationWindow::new(4, 4);
        window.record(outcome(OutcomeKind::SlowSuccess));
        window.record(outcome(OutcomeKind::Success));
        window.record(outcome(OutcomeKind::SlowFailure));
        window.record(outcome(OutcomeKind::Success));
        assert_eq!(window.slow_call_rate(), Some(50.0));
        assert_eq!(window.failure_rate(), Some(25.0));
    }
}
