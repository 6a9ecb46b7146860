//! Weighing Station Measurement Engine
//!
//! This crate runs the measurement cycle on top of a discovered station:
//!
//! ```text
//! Idle → Triggered → Weighing → Ranging → Publishing → Idle
//! ```
//!
//! # Triggers
//!
//! - **Flag** (default): a marker file requests exactly one measurement. The
//!   file is removed before the cycle runs, so every measurement needs a new
//!   flag. While no flag is present no device is touched.
//! - **Interval**: continuous monitoring on a fixed tick. Readings inside the
//!   deadband (or past the fault threshold) publish an all-zero record
//!   without ranging, and a weight equal to the last published one is not
//!   published again.
//!
//! # Sizing
//!
//! Item size per laser is `max(0, round(baseline − distance, 3))`, then
//! rounded to the nearest 1/200 (see [`sizing`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use ws_detect::{discover, DeviceBus, DiscoveryConfig, SerialPortOpener};
//! use ws_engine::{EngineConfig, HttpPublisher, MeasurementEngine};
//! use std::time::Duration;
//!
//! # async fn run(ports: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
//! let bus = DeviceBus::new(SerialPortOpener);
//! let station = discover(&bus, &ports, &DiscoveryConfig::default()).await?;
//! let publisher = HttpPublisher::new("http://127.0.0.1:5000/update_data", Duration::from_secs(10))?;
//!
//! let mut engine = MeasurementEngine::new(&bus, &station, publisher, EngineConfig::default());
//! engine.run().await;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod publisher;
pub mod record;
pub mod sizing;
pub mod state;
pub mod trigger;

pub use engine::{CycleOutcome, EngineConfig, MeasurementEngine};
pub use error::PublishError;
pub use publisher::{ChannelPublisher, HttpPublisher, Publisher};
pub use record::MeasurementRecord;
pub use state::{EngineState, LoadClass, Thresholds};
pub use trigger::{Trigger, TriggerPolicy};
