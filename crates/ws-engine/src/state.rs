//! Engine state and load classification

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the engine is within a measurement cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Waiting for a trigger
    #[default]
    Idle,
    /// Trigger received, cycle starting
    Triggered,
    /// Reading the scale
    Weighing,
    /// Querying lasers
    Ranging,
    /// Handing the record to the publisher
    Publishing,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Idle => "idle",
            EngineState::Triggered => "triggered",
            EngineState::Weighing => "weighing",
            EngineState::Ranging => "ranging",
            EngineState::Publishing => "publishing",
        };
        f.write_str(name)
    }
}

/// Weight limits applied in continuous monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Readings below this many grams count as an empty scale
    pub deadband_g: i32,
    /// Readings below this many grams indicate a scale fault or overflow
    pub fault_g: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            deadband_g: 30,
            fault_g: -10_000,
        }
    }
}

/// What a weight reading says about the scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadClass {
    /// Reading below the fault threshold
    Fault,
    /// Nothing (meaningful) on the scale
    Empty,
    /// An item is present
    Loaded,
}

impl Thresholds {
    pub fn classify(&self, grams: i32) -> LoadClass {
        if grams < self.fault_g {
            LoadClass::Fault
        } else if grams < self.deadband_g {
            LoadClass::Empty
        } else {
            LoadClass::Loaded
        }
    }
}
