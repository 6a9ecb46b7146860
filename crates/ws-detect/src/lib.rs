//! Weighing Station Device Detection Library
//!
//! This crate turns a list of unknown serial ports into a typed station:
//! one scale and any number of lasers, each laser with the baseline
//! distance it reported while the station was empty.
//!
//! - [`line`]: the seam between protocol logic and a physical serial port
//! - [`exchange`]: single-byte command / text reply exchange with bounded
//!   retries, plus the binary mass read
//! - [`scanner`]: serial port enumeration
//! - [`discovery`]: classification of ports into scale and lasers
//!
//! # Example
//!
//! ```rust,no_run
//! use ws_detect::{discover, DeviceBus, DiscoveryConfig, PortScanner, SerialPortOpener};
//!
//! # async fn run() -> Result<(), ws_detect::DetectError> {
//! let ports = PortScanner::new().candidate_ports()?;
//! let bus = DeviceBus::new(SerialPortOpener);
//! let station = discover(&bus, &ports, &DiscoveryConfig::default()).await?;
//! println!("scale on {}", station.scale_port());
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod error;
pub mod exchange;
pub mod line;
pub mod scanner;
pub mod station;

pub use discovery::{discover, DiscoveryConfig};
pub use error::{AttemptFailure, DetectError};
pub use exchange::{BusConfig, DeviceBus, RetryPolicy};
pub use line::{LineParity, LineSettings, PortOpener, SerialLine, SerialPortOpener};
pub use scanner::{PortScanner, ScannerConfig, SerialPortInfo};
pub use station::{CalibrationTable, Device, DeviceTable, Role, StationContext};
