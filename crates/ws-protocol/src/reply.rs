//! Text reply grammar
//!
//! Lasers answer with one ASCII line per command:
//!
//! ```text
//! identify:  "V:" DEVICE "," REST        e.g. V:LDM058,1.02
//! distance:  "D:" FLOAT "m" "," REST     e.g. D:0.703m,12
//! ```
//!
//! The laser identifier is the last three characters of the device token,
//! where the device token is whatever follows the final `:` before the
//! first comma.

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::ParseError;

/// Number of trailing characters of the device token that name a laser
pub const LASER_ID_LEN: usize = 3;

/// Short identifier a laser reports about itself (e.g. `058`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaserId(String);

impl LaserId {
    /// Take the trailing identifier characters of a device token
    ///
    /// Tokens shorter than [`LASER_ID_LEN`] are used whole. Returns `None`
    /// for an empty token.
    pub fn from_device_token(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        let skip = token.chars().count().saturating_sub(LASER_ID_LEN);
        Some(Self(token.chars().skip(skip).collect()))
    }

    /// The identifier itself
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which this laser's size is published (e.g. `laser058`)
    pub fn key(&self) -> String {
        format!("laser{}", self.0)
    }
}

impl fmt::Display for LaserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split `PREFIX HEAD "," REST` into head and rest
fn split_reply<'a>(line: &'a str, prefix: &'static str) -> Result<(&'a str, &'a str), ParseError> {
    let body = line
        .trim()
        .strip_prefix(prefix)
        .ok_or_else(|| ParseError::MissingPrefix {
            expected: prefix,
            line: line.to_string(),
        })?;
    body.split_once(',')
        .ok_or_else(|| ParseError::MissingSeparator(line.to_string()))
}

/// Parsed reply to an identify command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyReply {
    /// Device token (text after the final `:` before the first comma)
    pub device: String,
    /// Everything after the first comma (firmware version etc.)
    pub rest: String,
    laser_id: LaserId,
}

impl IdentifyReply {
    /// Identifier of the laser that sent this reply
    pub fn laser_id(&self) -> &LaserId {
        &self.laser_id
    }
}

impl FromStr for IdentifyReply {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (head, rest) = split_reply(line, "V:")?;
        let device = head.rsplit(':').next().unwrap_or(head).trim();
        let laser_id = LaserId::from_device_token(device).ok_or_else(|| {
            trace!("identify reply without device token: {:?}", line);
            ParseError::EmptyIdentifier(line.to_string())
        })?;

        Ok(Self {
            device: device.to_string(),
            rest: rest.trim().to_string(),
            laser_id,
        })
    }
}

/// Parsed reply to a distance command
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceReply {
    /// Measured distance in meters
    pub meters: f64,
    /// Accuracy/quality field reported after the comma
    pub accuracy: String,
}

impl FromStr for DistanceReply {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (head, rest) = split_reply(line, "D:")?;
        let token = head.trim();
        let number = token.strip_suffix('m').unwrap_or(token).trim();
        let meters: f64 = number
            .parse()
            .ok()
            .filter(|m: &f64| m.is_finite())
            .ok_or_else(|| {
                trace!("unparsable distance token {:?}", token);
                ParseError::InvalidDistance(token.to_string())
            })?;

        Ok(Self {
            meters,
            accuracy: rest.trim().to_string(),
        })
    }
}
