//! Measurement records handed to the publisher

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use ws_protocol::LaserId;

/// Timestamp format used in published records (local time, whole seconds)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One finished measurement
///
/// Serializes as a flat map: `timestamp`, `weight`, then one `laserXXX` key
/// per known laser in identifier order.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    /// Local time the cycle was triggered
    pub timestamp: String,
    /// Weight in kilograms, rounded to 3 decimals
    pub weight: f64,
    /// Rounded item size per laser, in meters
    pub lasers: BTreeMap<LaserId, f64>,
}

impl MeasurementRecord {
    pub fn new(timestamp: impl Into<String>, weight: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            weight,
            lasers: BTreeMap::new(),
        }
    }

    /// A record with zero weight and zero size for every laser in `ids`
    pub fn zeroed<'a>(timestamp: impl Into<String>, ids: impl IntoIterator<Item = &'a LaserId>) -> Self {
        let mut record = Self::new(timestamp, 0.0);
        for id in ids {
            record.lasers.insert(id.clone(), 0.0);
        }
        record
    }

    /// Size recorded for a laser
    pub fn laser(&self, id: &LaserId) -> Option<f64> {
        self.lasers.get(id).copied()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

impl Serialize for MeasurementRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.lasers.len()))?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        map.serialize_entry("weight", &self.weight)?;
        for (id, size) in &self.lasers {
            map.serialize_entry(&id.key(), size)?;
        }
        map.end()
    }
}

/// Current local time in the record format
pub fn local_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}
