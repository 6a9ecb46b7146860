//! Serial port scanner
//!
//! This module enumerates the serial ports a station's devices may be
//! attached to.

use serialport::{available_ports, SerialPortType};
use tracing::info;

use crate::error::DetectError;

/// Information about a serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., /dev/ttyUSB0)
    pub port: String,
    /// USB Vendor ID (if USB)
    pub vid: Option<u16>,
    /// USB Product ID (if USB)
    pub pid: Option<u16>,
    /// USB serial number (if available)
    pub serial_number: Option<String>,
    /// USB product string
    pub product: Option<String>,
}

impl SerialPortInfo {
    /// Create from serialport crate's port info
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(usb) => Self {
                port: name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                serial_number: usb.serial_number.clone(),
                product: usb.product.clone(),
            },
            _ => Self {
                port: name,
                vid: None,
                pid: None,
                serial_number: None,
                product: None,
            },
        }
    }

    /// One-line description: `vid:pid product (SN serial)`, parts omitted when unknown
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            parts.push(format!("{:04x}:{:04x}", vid, pid));
        }
        parts.push(self.product.clone().unwrap_or_else(|| "Unknown".to_string()));
        if let Some(serial) = &self.serial_number {
            parts.push(format!("(SN {})", serial));
        }
        parts.join(" ")
    }
}

/// Serial port scanner configuration
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// Only keep ports whose name starts with one of these (empty keeps all)
    pub prefixes: Vec<String>,
    /// Skip ports containing any of these patterns
    pub skip_patterns: Vec<String>,
}

/// Serial port scanner
pub struct PortScanner {
    config: ScannerConfig,
}

impl PortScanner {
    /// Create a scanner that keeps USB serial adapters
    pub fn new() -> Self {
        Self {
            config: ScannerConfig {
                prefixes: vec!["/dev/ttyUSB".to_string()],
                skip_patterns: vec!["Bluetooth".to_string()],
            },
        }
    }

    /// Create a scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Enumerate matching serial ports, sorted by name
    pub fn enumerate_ports(&self) -> Result<Vec<SerialPortInfo>, DetectError> {
        info!("Enumerating serial ports...");
        let ports = available_ports().map_err(|e| DetectError::EnumerationFailed(e.to_string()))?;

        let mut result: Vec<_> = ports
            .into_iter()
            .map(|p| SerialPortInfo::from_serialport(p.port_name, &p.port_type))
            .filter(|p| self.accepts(&p.port))
            .collect();
        result.sort_by(|a, b| a.port.cmp(&b.port));

        if result.is_empty() {
            info!("No serial ports found");
        } else {
            info!("Found {} serial port(s)", result.len());
            for port in &result {
                info!("  {} - {}", port.port, port.describe());
            }
        }

        Ok(result)
    }

    /// Names of the ports discovery should probe
    pub fn candidate_ports(&self) -> Result<Vec<String>, DetectError> {
        Ok(self
            .enumerate_ports()?
            .into_iter()
            .map(|p| p.port)
            .collect())
    }

    /// Check if a port name passes the prefix and skip filters
    fn accepts(&self, port: &str) -> bool {
        let prefixed = self.config.prefixes.is_empty()
            || self.config.prefixes.iter().any(|p| port.starts_with(p.as_str()));
        prefixed && !self.config.skip_patterns.iter().any(|p| port.contains(p.as_str()))
    }
}

impl Default for PortScanner {
    fn default() -> Self {
        Self::new()
    }
}
