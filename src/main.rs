//! circuit-sentinel demo.
//!
//! Drives a simulated flaky backend through a registry circuit breaker,
//! publishes the breaker's gauges to a Prometheus endpoint and prints the
//! final metrics snapshot as JSON.

use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;
use rand::Rng;
use tokio::sync::broadcast::error::TryRecvError;

use circuit_sentinel::config::{load_config, AppConfig};
use circuit_sentinel::lifecycle::{signals, Shutdown};
use circuit_sentinel::observability::logging;
use circuit_sentinel::observability::metrics::{self, MetricsPublisher};
use circuit_sentinel::resilience::{Backoff, BreakerRegistry, CallError};

#[derive(Parser)]
#[command(name = "circuit-sentinel")]
#[command(about = "Drive a simulated flaky backend through a circuit breaker", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name of the breaker to use
    #[arg(short, long, default_value = "backend")]
    breaker: String,

    /// Number of calls to attempt
    #[arg(long, default_value_t = 200)]
    calls: u32,

    /// Probability that a backend call fails (0.0 - 1.0)
    #[arg(long, default_value_t = 0.3, value_parser = parse_ratio)]
    failure_ratio: f64,

    /// Pause between calls
    #[arg(long, default_value_t = 20)]
    call_interval_ms: u64,

    /// Override the metrics endpoint address
    #[arg(long)]
    metrics_address: Option<String>,

    /// Do not start the metrics endpoint
    #[arg(long)]
    no_metrics: bool,
}

fn parse_ratio(s: &str) -> Result<f64, String> {
    let ratio: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(format!("{} is not a probability between 0.0 and 1.0", s))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("simulated backend failure")]
struct BackendError;

async fn simulated_backend(failure_ratio: f64) -> Result<(), BackendError> {
    let (fail, latency_ms) = {
        let mut rng = rand::thread_rng();
        (rng.gen_bool(failure_ratio), rng.gen_range(1..25))
    };
    tokio::time::sleep(Duration::from_millis(latency_ms)).await;
    if fail {
        Err(BackendError)
    } else {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(address) = cli.metrics_address {
        config.observability.metrics_address = address;
    }
    if cli.no_metrics {
        config.observability.metrics_enabled = false;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("circuit-sentinel v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = BreakerRegistry::new(config.breakers.clone())?;
    let shutdown = Shutdown::new();

    let publisher = MetricsPublisher::new(registry.clone(), config.observability.publish_interval());
    let publisher_task = tokio::spawn(publisher.run(shutdown.subscribe()));
    tokio::spawn(signals::shutdown_on_ctrl_c(shutdown.clone()));

    let breaker = registry.breaker(&cli.breaker);
    let mut transitions = breaker.subscribe();
    let mut stopping = shutdown.subscribe();

    let failure_ratio = cli.failure_ratio;
    let interval = Duration::from_millis(cli.call_interval_ms);
    let backoff = Backoff::new(interval.max(Duration::from_millis(10)), Duration::from_secs(2));
    let mut rejected_streak = 0u32;

    tracing::info!(
        breaker = %cli.breaker,
        calls = cli.calls,
        failure_ratio,
        "Starting simulation"
    );

    for _ in 0..cli.calls {
        let pause = match breaker.call_async(|| simulated_backend(failure_ratio)).await {
            Ok(()) => {
                rejected_streak = 0;
                interval
            }
            Err(CallError::Failed(e)) => {
                rejected_streak = 0;
                tracing::debug!(error = %e, "Backend call failed");
                interval
            }
            Err(CallError::NotPermitted(open)) => {
                rejected_streak += 1;
                let delay = backoff.delay(rejected_streak);
                tracing::debug!(reason = %open, delay_ms = delay.as_millis() as u64, "Backing off");
                delay
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = stopping.recv() => break,
        }
    }

    shutdown.trigger();
    let _ = publisher_task.await;

    let mut transition_count = 0u64;
    loop {
        match transitions.try_recv() {
            Ok(_) => transition_count += 1,
            Err(TryRecvError::Lagged(missed)) => transition_count += missed,
            Err(_) => break,
        }
    }
    tracing::info!(transitions = transition_count, "Simulation finished");

    println!("{}", serde_json::to_string_pretty(&breaker.metrics().snapshot())?);
    Ok(())
}
