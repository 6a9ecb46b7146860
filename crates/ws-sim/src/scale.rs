//! Virtual scale simulation

use ws_protocol::{mass::MAX_MAGNITUDE, Command, MassSample};

/// A simulated load-cell scale
///
/// The scale only understands the mass command. Anything else, including
/// the identify probe, goes unanswered.
#[derive(Debug, Clone)]
pub struct VirtualScale {
    grams: i32,
    responsive: bool,
    stale_input: Vec<u8>,
}

impl VirtualScale {
    /// Create a scale currently reading `grams`
    pub fn new(grams: i32) -> Self {
        Self {
            grams,
            responsive: true,
            stale_input: Vec::new(),
        }
    }

    /// Bytes already waiting in the input buffer whenever the line is opened
    pub fn with_stale_input(mut self, bytes: &[u8]) -> Self {
        self.stale_input = bytes.to_vec();
        self
    }

    /// Current reading in grams
    pub fn grams(&self) -> i32 {
        self.grams
    }

    /// Set the current reading
    pub fn set_grams(&mut self, grams: i32) {
        self.grams = grams;
    }

    /// Stop (or resume) answering mass requests
    pub fn set_responsive(&mut self, responsive: bool) {
        self.responsive = responsive;
    }

    pub(crate) fn stale_input(&self) -> &[u8] {
        &self.stale_input
    }

    /// Bytes sent back for a command byte
    pub fn respond(&self, byte: u8) -> Vec<u8> {
        match Command::from_byte(byte) {
            Some(Command::Mass) if self.responsive => self.sample().to_bytes().to_vec(),
            _ => Vec::new(),
        }
    }

    /// Sample for the current reading, saturated to what the wire can carry
    fn sample(&self) -> MassSample {
        let limit = i32::from(MAX_MAGNITUDE);
        let grams = self.grams.clamp(-limit, limit);
        MassSample::from_grams(grams).unwrap_or(MassSample {
            negative: grams < 0,
            magnitude: MAX_MAGNITUDE,
        })
    }
}
