//! Station device and calibration tables

use std::collections::BTreeMap;

use ws_protocol::LaserId;

use crate::error::DetectError;

/// What a port is connected to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// The load-cell scale
    Scale,
    /// A laser distance sensor
    Laser(LaserId),
}

/// A classified serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Port name (e.g., /dev/ttyUSB0)
    pub port: String,
    /// Device role
    pub role: Role,
}

/// Devices found while scanning ports
///
/// Holds at most one scale and at most one port per laser id; a port is
/// never assigned twice.
#[derive(Debug, Clone, Default)]
pub struct DeviceTable {
    scale: Option<String>,
    lasers: BTreeMap<LaserId, String>,
}

impl DeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the scale role to `port` if no scale is known yet
    pub fn assign_scale(&mut self, port: &str) -> bool {
        if self.scale.is_some() || self.contains_port(port) {
            return false;
        }
        self.scale = Some(port.to_string());
        true
    }

    /// Register a laser unless its id or port is already taken
    pub fn add_laser(&mut self, id: LaserId, port: &str) -> bool {
        if self.lasers.contains_key(&id) || self.contains_port(port) {
            return false;
        }
        self.lasers.insert(id, port.to_string());
        true
    }

    /// Port the scale is on, if one was found
    pub fn scale_port(&self) -> Option<&str> {
        self.scale.as_deref()
    }

    /// Port a laser is on
    pub fn laser_port(&self, id: &LaserId) -> Option<&str> {
        self.lasers.get(id).map(String::as_str)
    }

    /// Number of lasers
    pub fn laser_count(&self) -> usize {
        self.lasers.len()
    }

    fn contains_port(&self, port: &str) -> bool {
        self.scale.as_deref() == Some(port) || self.lasers.values().any(|p| p == port)
    }
}

/// Baseline distance per laser, measured with nothing on the station
#[derive(Debug, Clone, Default)]
pub struct CalibrationTable {
    baselines: BTreeMap<LaserId, f64>,
}

impl CalibrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a laser's baseline distance in meters
    pub fn insert(&mut self, id: LaserId, meters: f64) {
        self.baselines.insert(id, meters);
    }

    /// Baseline distance for a laser, if calibration succeeded
    pub fn baseline(&self, id: &LaserId) -> Option<f64> {
        self.baselines.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

/// Everything the measurement loop needs to know about the station
///
/// Built once by discovery and read-only afterwards. A context always has a
/// scale.
#[derive(Debug, Clone)]
pub struct StationContext {
    scale_port: String,
    lasers: BTreeMap<LaserId, String>,
    calibration: CalibrationTable,
}

impl StationContext {
    /// Build a context, failing with [`DetectError::NoScaleFound`] if the
    /// table has no scale
    pub fn new(
        devices: DeviceTable,
        calibration: CalibrationTable,
        probed: usize,
    ) -> Result<Self, DetectError> {
        let scale_port = devices.scale.ok_or(DetectError::NoScaleFound(probed))?;
        Ok(Self {
            scale_port,
            lasers: devices.lasers,
            calibration,
        })
    }

    /// Port the scale is on
    pub fn scale_port(&self) -> &str {
        &self.scale_port
    }

    /// Lasers in id order with their ports
    pub fn lasers(&self) -> impl Iterator<Item = (&LaserId, &str)> {
        self.lasers.iter().map(|(id, port)| (id, port.as_str()))
    }

    /// Number of lasers
    pub fn laser_count(&self) -> usize {
        self.lasers.len()
    }

    /// Baseline distance for a laser, if calibration succeeded
    pub fn baseline(&self, id: &LaserId) -> Option<f64> {
        self.calibration.baseline(id)
    }

    /// Calibration table
    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    /// All classified devices, scale first
    pub fn devices(&self) -> Vec<Device> {
        let mut devices = vec![Device {
            port: self.scale_port.clone(),
            role: Role::Scale,
        }];
        devices.extend(self.lasers.iter().map(|(id, port)| Device {
            port: port.clone(),
            role: Role::Laser(id.clone()),
        }));
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laser(id: &str) -> LaserId {
        LaserId::from_device_token(id).unwrap()
    }

    #[test]
    fn test_first_scale_wins() {
        let mut table = DeviceTable::new();
        assert!(table.assign_scale("/dev/ttyUSB0"));
        assert!(!table.assign_scale("/dev/ttyUSB1"));
        assert_eq!(table.scale_port(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn test_laser_ids_unique() {
        let mut table = DeviceTable::new();
        assert!(table.add_laser(laser("058"), "/dev/ttyUSB1"));
        assert!(!table.add_laser(laser("058"), "/dev/ttyUSB2"));
        assert_eq!(table.laser_port(&laser("058")), Some("/dev/ttyUSB1"));
        assert_eq!(table.laser_count(), 1);
    }

    #[test]
    fn test_port_assigned_once() {
        let mut table = DeviceTable::new();
        assert!(table.add_laser(laser("058"), "/dev/ttyUSB1"));
        assert!(!table.assign_scale("/dev/ttyUSB1"));
        assert!(!table.add_laser(laser("095"), "/dev/ttyUSB1"));
    }

    #[test]
    fn test_context_requires_scale() {
        let mut table = DeviceTable::new();
        table.add_laser(laser("058"), "/dev/ttyUSB1");
        let result = StationContext::new(table, CalibrationTable::new(), 1);
        assert!(matches!(result, Err(DetectError::NoScaleFound(1))));
    }

    #[test]
    fn test_context_devices() {
        let mut table = DeviceTable::new();
        table.assign_scale("/dev/ttyUSB0");
        table.add_laser(laser("095"), "/dev/ttyUSB2");
        table.add_laser(laser("058"), "/dev/ttyUSB1");
        let mut calibration = CalibrationTable::new();
        calibration.insert(laser("058"), 1.2);

        let station = StationContext::new(table, calibration, 3).unwrap();
        assert_eq!(station.scale_port(), "/dev/ttyUSB0");
        assert_eq!(station.baseline(&laser("058")), Some(1.2));
        assert_eq!(station.baseline(&laser("095")), None);

        let devices = station.devices();
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].role, Role::Scale);
        assert_eq!(devices[1].role, Role::Laser(laser("058")));
    }
}
