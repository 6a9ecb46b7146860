//! Item size arithmetic
//!
//! Decimal rounding works on the exact value of the float, not on a scaled
//! product: `0.4975` is stored just below the half step and rounds down.
//! Exact ties go to the even digit.

/// Round to `places` decimal places
pub fn round_decimals(value: f64, places: usize) -> f64 {
    // float formatting rounds the exact binary value correctly
    format!("{:.*}", places, value).parse().unwrap_or(value)
}

/// Round to the nearest 1/200 (0.005)
pub fn round_nearest_200(value: f64) -> f64 {
    (value * 200.0).round_ties_even() / 200.0
}

/// Raw item size: `max(0, round(baseline − distance, 3))`
pub fn item_size(baseline: f64, distance: f64) -> f64 {
    let size = round_decimals(baseline - distance, 3);
    // also folds -0.0 into 0.0
    if size > 0.0 {
        size
    } else {
        0.0
    }
}

/// Raw and published size for one laser reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserSize {
    /// Size rounded to millimeters
    pub raw: f64,
    /// Size rounded to the nearest 1/200
    pub rounded: f64,
}

impl LaserSize {
    /// Size of the item under a laser calibrated at `baseline`
    pub fn from_distance(baseline: f64, distance: f64) -> Self {
        let raw = item_size(baseline, distance);
        Self {
            raw,
            rounded: round_nearest_200(raw),
        }
    }
}

/// Grams to kilograms, rounded to 3 decimals
pub fn grams_to_kg(grams: i32) -> f64 {
    round_decimals(f64::from(grams) / 1000.0, 3)
}
