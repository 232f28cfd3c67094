//! Sensor readings and the weighted line-position estimate

use std::fmt;
use std::ops::Index;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// Default number of sensors in the array
pub const NUM_SENSORS: usize = 8;

/// Largest supported number of sensors
pub const MAX_SENSORS: usize = 16;

/// Full scale of a calibrated intensity
pub const CALIBRATED_MAX: u16 = 1000;

/// Span of the position scale covered by one sensor
pub const SENSOR_SPAN: u16 = 1000;

/// One intensity value per sensor, ordered left to right
///
/// Readings are produced fresh on every sample and never stored. Whether the
/// values are raw discharge times or calibrated intensities depends on the
/// call that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    values: ArrayVec<u16, MAX_SENSORS>,
}

impl SensorReading {
    /// Build a reading from a slice, keeping at most [`MAX_SENSORS`] values
    pub fn from_slice(values: &[u16]) -> Self {
        values.iter().copied().collect()
    }

    /// A reading of `len` zeros
    pub fn zeros(len: usize) -> Self {
        std::iter::repeat(0).take(len).collect()
    }

    /// The values as a slice
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// Mutable access to the values
    pub fn values_mut(&mut self) -> &mut [u16] {
        &mut self.values
    }

    /// Number of sensors in the reading
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the reading holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a single sensor
    pub fn get(&self, index: usize) -> Option<u16> {
        self.values.get(index).copied()
    }
}

impl Index<usize> for SensorReading {
    type Output = u16;

    fn index(&self, index: usize) -> &u16 {
        &self.values[index]
    }
}

impl FromIterator<u16> for SensorReading {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().take(MAX_SENSORS).collect(),
        }
    }
}

/// Weighted centroid of the line across the array
///
/// Sensor `i` sits at `i * SENSOR_SPAN`, so eight sensors span 0..=7000 with
/// the centre at 3500.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LinePosition(u16);

impl LinePosition {
    /// Wrap a raw position value
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// The raw position value
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Leftmost position (line under sensor 0)
    pub const fn leftmost() -> Self {
        Self(0)
    }

    /// Rightmost position for an array of `num_sensors`
    pub const fn rightmost(num_sensors: usize) -> Self {
        Self(num_sensors.saturating_sub(1) as u16 * SENSOR_SPAN)
    }

    /// Centre of the track for an array of `num_sensors`
    pub const fn center(num_sensors: usize) -> Self {
        Self(Self::rightmost(num_sensors).0 / 2)
    }

    /// Signed offset from the centre of an array of `num_sensors`
    pub fn offset_from_center(self, num_sensors: usize) -> i32 {
        self.0 as i32 - Self::center(num_sensors).0 as i32
    }
}

impl fmt::Display for LinePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a line-position estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEstimate {
    /// Estimated position (or the fallback edge when the line is lost)
    pub position: LinePosition,
    /// Whether any sensor saw the line
    pub on_line: bool,
}

/// Estimate the line position from line-oriented calibrated values
///
/// Values above `noise_threshold` contribute `value * i * SENSOR_SPAN` to a
/// weighted average. At least one value must exceed `on_line_threshold` for
/// the estimate to count; otherwise the line is lost and the result snaps to
/// the edge the line was last seen nearest: 0 if `last` was left of centre,
/// the rightmost position otherwise. The result always lies in
/// `[0, (N-1) * SENSOR_SPAN]`.
pub fn estimate_position(
    values: &[u16],
    last: LinePosition,
    noise_threshold: u16,
    on_line_threshold: u16,
) -> PositionEstimate {
    let n = values.len();
    let mut weighted: u64 = 0;
    let mut sum: u64 = 0;
    let mut on_line = false;

    for (i, &value) in values.iter().enumerate() {
        if value > on_line_threshold {
            on_line = true;
        }
        if value > noise_threshold {
            weighted += value as u64 * i as u64 * SENSOR_SPAN as u64;
            sum += value as u64;
        }
    }

    if !on_line || sum == 0 {
        let position = if last < LinePosition::center(n) {
            LinePosition::leftmost()
        } else {
            LinePosition::rightmost(n)
        };
        return PositionEstimate {
            position,
            on_line: false,
        };
    }

    PositionEstimate {
        position: LinePosition::new((weighted / sum) as u16),
        on_line: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_position_scale() {
        assert_eq!(LinePosition::center(8).value(), 3500);
        assert_eq!(LinePosition::rightmost(8).value(), 7000);
        assert_eq!(LinePosition::center(5).value(), 2000);
        assert_eq!(LinePosition::new(7000).offset_from_center(8), 3500);
        assert_eq!(LinePosition::new(0).offset_from_center(8), -3500);
    }

    #[test]
    fn test_reading_truncates_to_capacity() {
        let reading = SensorReading::from_slice(&[1; 20]);
        assert_eq!(reading.len(), MAX_SENSORS);
        assert_eq!(reading[0], 1);
        assert_eq!(reading.get(MAX_SENSORS), None);
    }

    #[test]
    fn test_estimate_single_sensor() {
        let values = [0, 0, 0, 1000, 0, 0, 0, 0];
        let est = estimate_position(&values, LinePosition::center(8), 50, 200);
        assert!(est.on_line);
        assert_eq!(est.position.value(), 3000);
    }

    #[test]
    fn test_estimate_between_sensors() {
        let values = [0, 0, 0, 1000, 1000, 0, 0, 0];
        let est = estimate_position(&values, LinePosition::leftmost(), 50, 200);
        assert_eq!(est.position.value(), 3500);

        let values = [0, 0, 0, 0, 0, 0, 500, 1000];
        let est = estimate_position(&values, LinePosition::leftmost(), 50, 200);
        // (500*6000 + 1000*7000) / 1500
        assert_eq!(est.position.value(), 6666);
    }

    #[test]
    fn test_estimate_ignores_noise() {
        let values = [40, 0, 0, 0, 0, 0, 0, 900];
        let est = estimate_position(&values, LinePosition::leftmost(), 50, 200);
        assert_eq!(est.position.value(), 7000);
    }

    #[test]
    fn test_lost_line_falls_back_to_last_edge() {
        let values = [0; 8];
        let left = estimate_position(&values, LinePosition::new(1200), 50, 200);
        assert!(!left.on_line);
        assert_eq!(left.position, LinePosition::leftmost());

        let right = estimate_position(&values, LinePosition::new(3500), 50, 200);
        assert_eq!(right.position, LinePosition::rightmost(8));

        // Faint values that never cross the on-line threshold count as lost
        let faint = [150; 8];
        let est = estimate_position(&faint, LinePosition::new(6000), 50, 200);
        assert!(!est.on_line);
        assert_eq!(est.position.value(), 7000);
    }

    #[test]
    fn test_estimate_stays_in_range() {
        let patterns: [[u16; 8]; 5] = [
            [1000; 8],
            [1000, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 1000],
            [201, 51, 51, 51, 51, 51, 51, 51],
            [999, 1, 500, 1000, 3, 700, 250, 60],
        ];
        for values in patterns {
            for last in [0u16, 3500, 7000] {
                let est = estimate_position(&values, LinePosition::new(last), 50, 200);
                assert!(est.position.value() <= 7000, "{:?} -> {}", values, est.position);
            }
        }
    }

    #[test]
    fn test_estimate_empty_array() {
        let est = estimate_position(&[], LinePosition::leftmost(), 50, 200);
        assert!(!est.on_line);
        assert_eq!(est.position.value(), 0);
    }
}
