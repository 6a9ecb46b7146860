//! Service settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use ws_detect::{BusConfig, DiscoveryConfig, LineParity, LineSettings, RetryPolicy, ScannerConfig};
use ws_engine::{EngineConfig, Thresholds, TriggerPolicy};

use crate::Cli;

/// Service settings, read from a JSON file
///
/// Every field is optional in the file; missing ones take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Ports to probe; empty means enumerate
    pub ports: Vec<String>,
    /// Enumerated ports must start with this
    pub port_prefix: String,
    /// Baud rate for all devices
    pub baud_rate: u32,
    /// Parity for the laser text protocol
    pub text_parity: LineParity,
    /// Parity for the scale mass read
    pub mass_parity: LineParity,
    /// Attempts per text command (calibration and ranging)
    pub retries: u32,
    /// Delay between writing a command and reading the reply
    pub settle_ms: u64,
    /// Serial read timeout
    pub read_timeout_ms: u64,
    /// How long to wait for a mass sample
    pub mass_window_ms: u64,
    /// Measurement trigger
    pub trigger: TriggerPolicy,
    /// Continuous mode: readings below this count as empty
    pub deadband_g: i32,
    /// Continuous mode: readings below this count as a scale fault
    pub fault_threshold_g: i32,
    /// Storage endpoint
    pub publish_url: String,
    /// Publish request timeout
    pub publish_timeout_ms: u64,
    /// Default log level when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            ports: Vec::new(),
            port_prefix: "/dev/ttyUSB".to_string(),
            baud_rate: 19200,
            text_parity: LineParity::None,
            mass_parity: LineParity::Space,
            retries: 5,
            settle_ms: 500,
            read_timeout_ms: 1000,
            mass_window_ms: 1000,
            trigger: TriggerPolicy::default(),
            deadband_g: thresholds.deadband_g,
            fault_threshold_g: thresholds.fault_g,
            publish_url: "http://127.0.0.1:5000/update_data".to_string(),
            publish_timeout_ms: 10_000,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for weighstation
    /// Uses $XDG_CONFIG_HOME/weighstation, falls back to ~/.config/weighstation
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("weighstation"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("weighstation"))
    }

    /// Default settings file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from `path`, or from the default location
    ///
    /// A missing file yields the defaults. An explicitly given file must
    /// exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    /// Apply command-line overrides
    pub fn merge_cli_args(&mut self, args: &Cli) {
        if !args.ports.is_empty() {
            self.ports = args.ports.clone();
        }
        if let Some(ref url) = args.publish_url {
            self.publish_url = url.clone();
        }
        if args.continuous && !self.trigger.is_continuous() {
            self.trigger = TriggerPolicy::interval();
        }
        if let Some(ref level) = args.log_level {
            self.log_level = level.clone();
        }
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            bail!("Invalid log level: {}", self.log_level);
        }
        if self.baud_rate == 0 {
            bail!("Baud rate must be positive");
        }
        if self.retries == 0 {
            bail!("Retries must be at least 1");
        }
        if !(self.publish_url.starts_with("http://") || self.publish_url.starts_with("https://")) {
            bail!("Publish URL must be http(s): {}", self.publish_url);
        }
        if self.fault_threshold_g > self.deadband_g {
            bail!(
                "Fault threshold ({} g) is above the deadband ({} g)",
                self.fault_threshold_g,
                self.deadband_g
            );
        }
        Ok(())
    }

    fn line(&self, parity: LineParity) -> LineSettings {
        LineSettings {
            baud_rate: self.baud_rate,
            parity,
            timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    /// Retry policy for calibration and ranging
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retries,
            ..RetryPolicy::standard()
        }
    }

    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            text_line: self.line(self.text_parity),
            settle: Duration::from_millis(self.settle_ms),
            mass_line: self.line(self.mass_parity),
            mass_window: Duration::from_millis(self.mass_window_ms),
        }
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            probe: RetryPolicy::probe(),
            calibration: self.retry_policy(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            trigger: self.trigger.clone(),
            thresholds: Thresholds {
                deadband_g: self.deadband_g,
                fault_g: self.fault_threshold_g,
            },
            ranging: self.retry_policy(),
        }
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            prefixes: vec![self.port_prefix.clone()],
            skip_patterns: vec!["Bluetooth".to_string()],
        }
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}
