//! Weighing station service
//!
//! Discovers the scale and laser sensors on the serial ports, calibrates the
//! lasers against the empty station and then publishes a measurement every
//! time it is triggered.
//!
//! # Usage
//!
//! ```bash
//! # Probe /dev/ttyUSB* and measure whenever /tmp/do_measure.flag appears
//! weighstation
//!
//! # Fixed ports, continuous monitoring
//! weighstation --port /dev/ttyUSB0 --port /dev/ttyUSB1 --continuous
//!
//! # Measurement data only
//! RUST_LOG=data=info weighstation
//! ```

mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use settings::Settings;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ws_detect::{discover, DetectError, DeviceBus, PortScanner, Role, SerialPortOpener};
use ws_engine::{HttpPublisher, MeasurementEngine};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(
    name = "weighstation",
    about = "Weighs items and measures their size with laser sensors",
    version
)]
pub struct Cli {
    /// Path to the settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial port to probe (repeatable; skips enumeration)
    #[arg(short, long = "port", value_name = "PORT")]
    ports: Vec<String>,

    /// Storage endpoint URL
    #[arg(long, value_name = "URL")]
    publish_url: Option<String>,

    /// Measure on a fixed tick instead of waiting for the flag file
    #[arg(long)]
    continuous: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Print the effective settings and exit
    #[arg(long)]
    print_config: bool,

    /// List candidate serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

/// Initialize logging
///
/// `RUST_LOG` wins; otherwise every workspace crate and the `data` target
/// log at `level`.
fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "weighstation={0},ws_detect={0},ws_engine={0},ws_protocol={0},data={0}",
                level
            ))
        })
        .context("Failed to parse log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    settings.merge_cli_args(&args);
    settings.validate().context("Invalid configuration")?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    init_tracing(&settings.log_level)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Weighing station starting");

    let scanner = PortScanner::with_config(settings.scanner_config());
    if args.list_ports {
        for port in scanner.enumerate_ports()? {
            println!("{}\t{}", port.port, port.describe());
        }
        return Ok(());
    }

    let ports = if settings.ports.is_empty() {
        scanner
            .candidate_ports()
            .context("Failed to enumerate serial ports")?
    } else {
        settings.ports.clone()
    };

    let bus = DeviceBus::with_config(SerialPortOpener, settings.bus_config());
    let station = match discover(&bus, &ports, &settings.discovery_config()).await {
        Ok(station) => station,
        Err(e @ DetectError::NoScaleFound(_)) => {
            error!("Scale not found, exiting");
            return Err(e).context("Device discovery failed");
        }
        Err(e) => return Err(e).context("Device discovery failed"),
    };

    for device in station.devices() {
        match &device.role {
            Role::Scale => info!("{}: scale", device.port),
            Role::Laser(id) => match station.baseline(id) {
                Some(baseline) => info!("{}: {} (baseline {} m)", device.port, id.key(), baseline),
                None => warn!("{}: {} (not calibrated)", device.port, id.key()),
            },
        }
    }

    let publisher = HttpPublisher::new(settings.publish_url.clone(), settings.publish_timeout())
        .context("Failed to create publisher")?;
    info!("Publishing to {}", publisher.url());

    let mut engine = MeasurementEngine::new(&bus, &station, publisher, settings.engine_config());
    tokio::select! {
        _ = engine.run() => {},
        _ = shutdown_signal() => info!("Shutdown signal received"),
    }

    info!("Weighing station stopped");
    Ok(())
}
