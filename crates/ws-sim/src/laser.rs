//! Virtual laser simulation

use ws_protocol::Command;

/// A simulated laser distance sensor
#[derive(Debug, Clone)]
pub struct VirtualLaser {
    /// Device token reported in the identify reply (e.g. `LDM058`)
    device: String,
    /// Firmware field reported after the comma
    firmware: String,
    /// Current distance to the nearest surface, in meters
    distance_m: f64,
    /// Accuracy field reported after the distance
    accuracy: String,
    /// Whether the laser answers at all
    responsive: bool,
    /// Replaces the distance reply verbatim when set
    distance_reply: Option<String>,
}

impl VirtualLaser {
    /// Create a laser reporting `device` and currently measuring `distance_m`
    pub fn new(device: impl Into<String>, distance_m: f64) -> Self {
        Self {
            device: device.into(),
            firmware: "1.02".to_string(),
            distance_m,
            accuracy: "ok".to_string(),
            responsive: true,
            distance_reply: None,
        }
    }

    /// Device token
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Current distance in meters
    pub fn distance(&self) -> f64 {
        self.distance_m
    }

    /// Set the current distance
    pub fn set_distance(&mut self, meters: f64) {
        self.distance_m = meters;
    }

    /// Stop (or resume) answering commands
    pub fn set_responsive(&mut self, responsive: bool) {
        self.responsive = responsive;
    }

    /// Answer distance requests with `line` instead of a measurement
    pub fn set_distance_reply(&mut self, line: Option<String>) {
        self.distance_reply = line;
    }

    /// Bytes sent back for a command byte
    pub fn respond(&self, byte: u8) -> Vec<u8> {
        if !self.responsive {
            return Vec::new();
        }

        let line = match Command::from_byte(byte) {
            Some(Command::Identify) => format!("V:{},{}", self.device, self.firmware),
            Some(Command::Distance) => match &self.distance_reply {
                Some(reply) => reply.clone(),
                None => format!("D:{:.3}m,{}", self.distance_m, self.accuracy),
            },
            _ => return Vec::new(),
        };

        format!("{}\r\n", line).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_reply() {
        let laser = VirtualLaser::new("LDM058", 1.2);
        assert_eq!(laser.respond(Command::Identify.byte()), b"V:LDM058,1.02\r\n");
    }

    #[test]
    fn test_distance_reply() {
        let mut laser = VirtualLaser::new("LDM058", 1.2);
        assert_eq!(laser.respond(Command::Distance.byte()), b"D:1.200m,ok\r\n");

        laser.set_distance(0.703);
        assert_eq!(laser.respond(Command::Distance.byte()), b"D:0.703m,ok\r\n");
    }

    #[test]
    fn test_override_and_silence() {
        let mut laser = VirtualLaser::new("LDM058", 1.2);
        laser.set_distance_reply(Some("D:Er01m,ok".to_string()));
        assert_eq!(laser.respond(Command::Distance.byte()), b"D:Er01m,ok\r\n");

        laser.set_responsive(false);
        assert!(laser.respond(Command::Identify.byte()).is_empty());
    }

    #[test]
    fn test_ignores_mass() {
        let laser = VirtualLaser::new("LDM058", 1.2);
        assert!(laser.respond(Command::Mass.byte()).is_empty());
    }
}
