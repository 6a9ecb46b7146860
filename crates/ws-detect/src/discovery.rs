//! Device discovery
//!
//! Every candidate port gets a single identify probe. Lasers answer it with
//! a `V:` line naming themselves; the scale does not speak the text
//! protocol, so the first port that stays silent is taken as the scale.
//! Each laser is calibrated right after it is identified by measuring the
//! distance to the empty station. A port that cannot be opened counts as a
//! failed probe like any other, so it can be taken as the scale.

use tracing::{error, info, warn};
use ws_protocol::{Command, IdentifyReply};

use crate::error::DetectError;
use crate::exchange::{DeviceBus, RetryPolicy};
use crate::line::PortOpener;
use crate::station::{CalibrationTable, DeviceTable, StationContext};

/// Configuration for discovery
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Retry policy for the identify probe
    pub probe: RetryPolicy,
    /// Retry policy for the calibration distance
    pub calibration: RetryPolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe: RetryPolicy::probe(),
            calibration: RetryPolicy::standard(),
        }
    }
}

/// Probe `ports` in order and build the station context
///
/// Fails with [`DetectError::NoScaleFound`] if no port could be taken as
/// the scale. Finding no lasers is only a warning. A laser whose
/// calibration fails stays in the table without a baseline.
pub async fn discover<O: PortOpener>(
    bus: &DeviceBus<O>,
    ports: &[String],
    config: &DiscoveryConfig,
) -> Result<StationContext, DetectError> {
    info!("Probing {} port(s): {:?}", ports.len(), ports);

    let mut devices = DeviceTable::new();
    let mut calibration = CalibrationTable::new();

    for port in ports {
        let reply = match bus
            .send_and_await(port, Command::Identify, &config.probe)
            .await
        {
            Ok(line) => line,
            Err(e) => {
                if devices.assign_scale(port) {
                    info!(port = %port, "Scale found");
                } else {
                    warn!(port = %port, "Ignoring extra unidentified device ({})", e);
                }
                continue;
            }
        };

        let id = match reply.parse::<IdentifyReply>() {
            Ok(identify) => identify.laser_id().clone(),
            Err(e) => {
                warn!(port = %port, "Ignoring device with unusable identify reply: {}", e);
                continue;
            }
        };

        if !devices.add_laser(id.clone(), port) {
            warn!(port = %port, laser = %id, "Ignoring laser with duplicate id");
            continue;
        }
        info!(port = %port, laser = %id, "Laser {} found", id.key());

        match bus.measure_distance(port, &config.calibration).await {
            Ok(distance) => {
                info!(laser = %id, "Calibrated baseline {:.3} m", distance.meters);
                calibration.insert(id, distance.meters);
            }
            Err(e) => {
                warn!(laser = %id, "Calibration failed, baseline defaults to 0: {}", e);
            }
        }
    }

    if devices.laser_count() == 0 {
        warn!("No lasers found, running scale-only");
    }

    StationContext::new(devices, calibration, ports.len()).inspect_err(|e| error!("{}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_discovery_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.probe.attempts, 1);
        assert_eq!(config.calibration.attempts, 5);
    }
}
