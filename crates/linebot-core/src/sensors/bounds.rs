//! Per-sensor calibration bounds

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use super::reading::{SensorReading, CALIBRATED_MAX, MAX_SENSORS};

/// Observed (min, max) raw value for every sensor
///
/// Written only while calibrating; afterwards raw values are normalised
/// against these bounds so every calibrated value lies in
/// `[0, CALIBRATED_MAX]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationBounds {
    min: ArrayVec<u16, MAX_SENSORS>,
    max: ArrayVec<u16, MAX_SENSORS>,
    calibrated: bool,
}

impl CalibrationBounds {
    /// Fresh, uncalibrated bounds: min at the timeout, max at zero
    pub fn new(num_sensors: usize, timeout_ticks: u16) -> Self {
        let n = num_sensors.min(MAX_SENSORS);
        Self {
            min: std::iter::repeat(timeout_ticks).take(n).collect(),
            max: std::iter::repeat(0).take(n).collect(),
            calibrated: false,
        }
    }

    /// Known bounds, e.g. restored from a previous run
    pub fn from_pairs(pairs: &[(u16, u16)]) -> Self {
        let pairs = &pairs[..pairs.len().min(MAX_SENSORS)];
        Self {
            min: pairs.iter().map(|&(min, _)| min).collect(),
            max: pairs.iter().map(|&(_, max)| max).collect(),
            calibrated: true,
        }
    }

    /// Number of sensors covered
    pub fn len(&self) -> usize {
        self.min.len()
    }

    /// Whether the bounds cover no sensors
    pub fn is_empty(&self) -> bool {
        self.min.is_empty()
    }

    /// Whether at least one batch has been recorded
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Minimum bound of a sensor
    pub fn min(&self, index: usize) -> Option<u16> {
        self.min.get(index).copied()
    }

    /// Maximum bound of a sensor
    pub fn max(&self, index: usize) -> Option<u16> {
        self.max.get(index).copied()
    }

    /// Whether a sensor's bounds carry no usable range (max <= min)
    pub fn is_degenerate(&self, index: usize) -> bool {
        match (self.min(index), self.max(index)) {
            (Some(min), Some(max)) => max <= min,
            _ => true,
        }
    }

    /// Indices of all sensors with degenerate bounds
    pub fn degenerate_sensors(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&i| self.is_degenerate(i))
    }

    /// Record one batch of raw samples taken in quick succession
    ///
    /// Per sensor, the maximum bound grows only to the smallest value in the
    /// batch and the minimum bound shrinks only to the largest, so a single
    /// outlier sample cannot widen the range.
    pub fn record_batch(&mut self, samples: &[SensorReading]) {
        if samples.is_empty() {
            return;
        }

        for i in 0..self.len() {
            let mut batch_min = u16::MAX;
            let mut batch_max = 0u16;
            for sample in samples {
                if let Some(value) = sample.get(i) {
                    batch_min = batch_min.min(value);
                    batch_max = batch_max.max(value);
                }
            }
            if batch_min > batch_max {
                continue;
            }

            if batch_min > self.max[i] {
                self.max[i] = batch_min;
            }
            if batch_max < self.min[i] {
                self.min[i] = batch_max;
            }
        }

        self.calibrated = true;
    }

    /// Normalise one raw value against a sensor's bounds
    ///
    /// Returns `(raw - min) * 1000 / (max - min)` clamped to
    /// `[0, CALIBRATED_MAX]`, or 0 when the bounds are degenerate.
    pub fn normalize(&self, index: usize, raw: u16) -> u16 {
        if self.is_degenerate(index) {
            return 0;
        }
        let min = self.min[index] as i32;
        let max = self.max[index] as i32;
        let scaled = (raw as i32 - min) * CALIBRATED_MAX as i32 / (max - min);
        scaled.clamp(0, CALIBRATED_MAX as i32) as u16
    }

    /// Normalise a whole raw reading
    pub fn normalize_reading(&self, raw: &SensorReading) -> SensorReading {
        raw.values()
            .iter()
            .enumerate()
            .map(|(i, &value)| self.normalize(i, value))
            .collect()
    }
}
