//! Weighing Station Simulation Library
//!
//! This crate provides simulated station hardware for testing discovery and
//! measurement without serial devices attached:
//!
//! - **VirtualScale**: answers mass requests with signed-magnitude samples
//! - **VirtualLaser**: answers identify and distance requests with text lines
//! - **SimBus**: a [`ws_detect::PortOpener`] that maps port names to virtual
//!   devices and counts the commands each one receives
//!
//! # Example
//!
//! ```rust
//! use ws_sim::{SimBus, VirtualLaser, VirtualScale};
//! use ws_protocol::Command;
//!
//! let bus = SimBus::new();
//! let scale = bus.attach("/dev/ttyUSB0", VirtualScale::new(1250));
//! let laser = bus.attach("/dev/ttyUSB1", VirtualLaser::new("LDM058", 1.2));
//!
//! laser.set_distance(0.7);
//! assert_eq!(scale.commands_received(Command::Mass), 0);
//! ```

pub mod bus;
pub mod laser;
pub mod scale;

pub use bus::{SimBus, SimDevice, SimLine, VirtualDevice};
pub use laser::VirtualLaser;
pub use scale::VirtualScale;
