//! # HoTT Telemetry
//!
//! Emulates Graupner HoTT telemetry sensors on a receiver's telemetry port.
//!
//! The protocol is ticked from a fixed-rate interval; a second, slower
//! interval reopens the serial port after it has been lost.
//!
//! # Usage
//!
//! ```bash
//! hott-telemetry [config.toml]
//! ```
//!
//! Expected output:
//! ```text
//! INFO hott_telemetry: HoTT telemetry v0.1.0 starting...
//! INFO hott_telemetry::serial: Opened HoTT telemetry port /dev/ttyUSB0
//! INFO hott_telemetry::hott::state_machine: HoTT telemetry enabled
//! ```

use std::time::Instant;

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};
use tracing::{debug, info};

use hott_telemetry::config::Config;
use hott_telemetry::hott::textmode::{SharedTaskPeriod, TextModeAdapter};
use hott_telemetry::hott::HottTelemetry;
use hott_telemetry::overlay::StatusOverlay;
use hott_telemetry::serial::SerialPortProvider;

/// Configuration used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Seconds between status log messages
const STATUS_LOG_INTERVAL_S: u64 = 30;

fn config_path_from_args(mut args: impl Iterator<Item = String>) -> String {
    args.nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

fn task_interval(period: Duration) -> Interval {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tick
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("HoTT telemetry v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = config_path_from_args(std::env::args());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let task_period = SharedTaskPeriod::new(config.task_period());
    let provider = SerialPortProvider::new(config.serial.port.clone(), config.port_timeout());
    let mut telemetry = HottTelemetry::new(provider, config.hott_settings());

    if config.textmode.enabled {
        let adapter = TextModeAdapter::new(
            Box::new(StatusOverlay::new(config.sensors)),
            Box::new(task_period.clone()),
            config.textmode_task_period(),
        );
        telemetry = telemetry.with_textmode(adapter);
        info!("Text mode status menu enabled");
    }

    telemetry.check_state(config.hott.enabled);

    let start = Instant::now();
    let mut current_period = task_period.get();
    let mut tick = task_interval(current_period);
    let mut reconnect = interval(config.reconnect_interval());
    let mut status = interval(Duration::from_secs(STATUS_LOG_INTERVAL_S));

    info!(
        "Serving HoTT polls on {} at {}Hz",
        config.serial.port, config.hott.task_rate_hz
    );
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = tick.tick() => {
                telemetry.handle(start.elapsed(), &config.sensors);

                // Text mode speeds the task up while a menu session is alive
                let period = task_period.get();
                if period != current_period {
                    debug!("Task period {:?} -> {:?}", current_period, period);
                    current_period = period;
                    tick = task_interval(period);
                }
            }

            _ = reconnect.tick() => {
                telemetry.check_state(config.hott.enabled);
            }

            _ = status.tick() => {
                info!(
                    "HoTT telemetry {} (state {:?})",
                    if telemetry.is_enabled() { "active" } else { "waiting for port" },
                    telemetry.state()
                );
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    telemetry.check_state(false);
    Ok(())
}
