//! Weighing Station Protocol Library
//!
//! This crate provides the wire-level pieces shared by every device on a
//! weighing station:
//!
//! - **Commands**: single-byte requests (`V` identify, `D` distance, `E` mass)
//! - **Replies**: ASCII lines `V:<id>,...` and `D:<meters>m,<accuracy>`
//! - **Mass codec**: 2-byte little-endian signed-magnitude weight samples
//!
//! # Architecture
//!
//! Text replies are matched against a fixed grammar instead of being
//! sliced apart with string replacement, so a reply either parses into a
//! typed value or yields a [`ParseError`] naming what was wrong.
//!
//! The mass path is binary and has no line framing: the scale answers a
//! mass request with exactly two bytes.
//!
//! # Example
//!
//! ```rust
//! use ws_protocol::{reply::DistanceReply, MassSample};
//!
//! let reply: DistanceReply = "D:0.703m,12".parse().unwrap();
//! assert_eq!(reply.meters, 0.703);
//!
//! let sample = MassSample::from_bytes(&[0x1E, 0x80]).unwrap();
//! assert_eq!(sample.grams(), -30);
//! ```

pub mod command;
pub mod error;
pub mod mass;
pub mod reply;

pub use command::Command;
pub use error::ParseError;
pub use mass::MassSample;
pub use reply::{DistanceReply, IdentifyReply, LaserId};
