//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus exporter
//! - Count calls, rejections and state transitions per breaker
//! - Publish breaker gauges from live metrics views
//!
//! # Metrics
//! - `circuit_breaker_calls_total` (counter): completed calls by `kind`
//! - `circuit_breaker_call_duration_seconds` (histogram): protected work latency
//! - `circuit_breaker_not_permitted_calls_total` (counter): rejections by `state`
//! - `circuit_breaker_state_transitions_total` (counter): by `from`/`to`
//! - `circuit_breaker_buffered_calls` (gauge): window counts by `kind`
//!   (`failed`, `successful`, `slow`)
//! - `circuit_breaker_max_buffered_calls` (gauge): current window capacity
//! - `circuit_breaker_not_permitted_calls` (gauge): rejections in current state
//! - `circuit_breaker_failure_rate` / `circuit_breaker_slow_call_rate` (gauge):
//!   percentage, -1 until enough calls are buffered
//! - `circuit_breaker_state` (gauge): 1 for the current `state`, 0 otherwise
//!
//! Every metric carries a `name` label with the breaker name.

use std::net::SocketAddr;
use std::time::Duration;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tokio::sync::broadcast;
use tokio::time;

use crate::resilience::{BreakerRegistry, MetricsView, Outcome, State};

pub const CALLS_TOTAL: &str = "circuit_breaker_calls_total";
pub const CALL_DURATION_SECONDS: &str = "circuit_breaker_call_duration_seconds";
pub const NOT_PERMITTED_TOTAL: &str = "circuit_breaker_not_permitted_calls_total";
pub const STATE_TRANSITIONS_TOTAL: &str = "circuit_breaker_state_transitions_total";
pub const BUFFERED_CALLS: &str = "circuit_breaker_buffered_calls";
pub const MAX_BUFFERED_CALLS: &str = "circuit_breaker_max_buffered_calls";
pub const NOT_PERMITTED_CALLS: &str = "circuit_breaker_not_permitted_calls";
pub const FAILURE_RATE: &str = "circuit_breaker_failure_rate";
pub const SLOW_CALL_RATE: &str = "circuit_breaker_slow_call_rate";
pub const STATE: &str = "circuit_breaker_state";

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Register help text for every metric.
pub fn describe_metrics() {
    ::metrics::describe_counter!(CALLS_TOTAL, "Completed calls through the circuit breaker");
    ::metrics::describe_histogram!(
        CALL_DURATION_SECONDS,
        ::metrics::Unit::Seconds,
        "Duration of protected calls"
    );
    ::metrics::describe_counter!(NOT_PERMITTED_TOTAL, "Calls rejected without running");
    ::metrics::describe_counter!(STATE_TRANSITIONS_TOTAL, "Circuit breaker state transitions");
    ::metrics::describe_gauge!(BUFFERED_CALLS, "Calls buffered in the current window");
    ::metrics::describe_gauge!(MAX_BUFFERED_CALLS, "Capacity of the current window");
    ::metrics::describe_gauge!(NOT_PERMITTED_CALLS, "Calls rejected since the current state was entered");
    ::metrics::describe_gauge!(FAILURE_RATE, "Failure percentage of the current window");
    ::metrics::describe_gauge!(SLOW_CALL_RATE, "Slow call percentage of the current window");
    ::metrics::describe_gauge!(STATE, "1 for the breaker's current state");
}

pub fn record_call(breaker: &str, outcome: Outcome) {
    ::metrics::counter!(
        CALLS_TOTAL,
        "name" => breaker.to_string(),
        "kind" => outcome.kind().as_str()
    )
    .increment(1);
    ::metrics::histogram!(CALL_DURATION_SECONDS, "name" => breaker.to_string())
        .record(outcome.elapsed().as_secs_f64());
}

pub fn record_rejected(breaker: &str, state: State) {
    ::metrics::counter!(
        NOT_PERMITTED_TOTAL,
        "name" => breaker.to_string(),
        "state" => state.as_str()
    )
    .increment(1);
}

pub fn record_state_transition(breaker: &str, from: State, to: State) {
    ::metrics::counter!(
        STATE_TRANSITIONS_TOTAL,
        "name" => breaker.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// Set every gauge for one breaker from its view, as of now.
pub fn publish_breaker(view: &MetricsView) {
    let snapshot = view.snapshot();
    let name = snapshot.name;

    let buffered = [
        ("failed", snapshot.failed),
        ("successful", snapshot.successful),
        ("slow", snapshot.slow),
    ];
    for (kind, count) in buffered {
        ::metrics::gauge!(BUFFERED_CALLS, "name" => name.clone(), "kind" => kind).set(count as f64);
    }

    ::metrics::gauge!(MAX_BUFFERED_CALLS, "name" => name.clone()).set(snapshot.max_buffered as f64);
    ::metrics::gauge!(NOT_PERMITTED_CALLS, "name" => name.clone()).set(snapshot.rejected as f64);
    ::metrics::gauge!(FAILURE_RATE, "name" => name.clone())
        .set(snapshot.failure_rate.map_or(-1.0, f64::from));
    ::metrics::gauge!(SLOW_CALL_RATE, "name" => name.clone())
        .set(snapshot.slow_call_rate.map_or(-1.0, f64::from));

    for state in State::ALL {
        let value = if state == snapshot.state { 1.0 } else { 0.0 };
        ::metrics::gauge!(STATE, "name" => name.clone(), "state" => state.as_str()).set(value);
    }
}

/// Periodically republishes gauges for every breaker in a registry.
pub struct MetricsPublisher {
    registry: BreakerRegistry,
    interval: Duration,
}

impl MetricsPublisher {
    pub fn new(registry: BreakerRegistry, interval: Duration) -> Self {
        Self { registry, interval }
    }

    pub fn publish_all(&self) {
        for breaker in self.registry.all() {
            publish_breaker(&breaker.metrics());
        }
    }

    /// Publish on every tick until shutdown, then once more.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Metrics publisher starting");

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.publish_all();
                }
                _ = shutdown.recv() => {
                    self.publish_all();
                    tracing::info!("Metrics publisher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
