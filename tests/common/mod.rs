//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use circuit_sentinel::config::BreakerConfig;
use circuit_sentinel::resilience::{CallError, CircuitBreaker, ManualClock};

/// Backend that fails its first `failures` calls, then succeeds.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    calls: Arc<AtomicU32>,
    failures: u32,
}

#[allow(dead_code)]
impl ScriptedBackend {
    pub fn failing_first(failures: u32) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            failures,
        }
    }

    pub fn invoke(&self) -> Result<(), String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(format!("error on call {}", n + 1))
        } else {
            Ok(())
        }
    }

    /// Times the backend actually ran.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Run the backend through the breaker, swallowing the error the way a
/// caller with a fallback would.
#[allow(dead_code)]
pub fn run_with_breaker(breaker: &CircuitBreaker, backend: &ScriptedBackend) -> Result<(), CallError<String>> {
    breaker.call(|| backend.invoke())
}

/// Config with a 1s wait, 10% failure threshold, closed window of 2 and a
/// single half-open probe.
#[allow(dead_code)]
pub fn small_window_config() -> BreakerConfig {
    BreakerConfig {
        failure_rate_threshold: 10.0,
        closed_buffer_size: 2,
        half_open_buffer_size: 1,
        wait_duration_in_open_state_ms: 1_000,
        ..BreakerConfig::default()
    }
}

#[allow(dead_code)]
pub fn manual_breaker(name: &str, config: BreakerConfig) -> (CircuitBreaker, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let breaker = CircuitBreaker::with_clock(name, config, clock.clone()).unwrap();
    (breaker, clock)
}

#[allow(dead_code)]
pub const ONE_SECOND: Duration = Duration::from_secs(1);
