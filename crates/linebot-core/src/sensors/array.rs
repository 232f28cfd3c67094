//! Sensor array driver: raw reads, calibration records and line estimates

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use super::bounds::CalibrationBounds;
use super::reading::{
    estimate_position, LinePosition, SensorReading, CALIBRATED_MAX, MAX_SENSORS,
};
use crate::hardware::ReflectanceSensor;
use crate::{Error, Result};

/// How the IR emitters are driven during a read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmitterMode {
    /// Emitters stay off (ambient light only)
    Off,
    /// Emitters on for the read, off afterwards
    #[default]
    On,
    /// One lit read and one dark read; ambient light is subtracted out
    OnAndOff,
}

impl EmitterMode {
    /// The mode matching a plain on/off flag
    pub fn from_flag(emitters_on: bool) -> Self {
        if emitters_on {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// Colour of the line relative to the floor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineColor {
    /// Dark line on a light floor
    #[default]
    Dark,
    /// Light line on a dark floor
    Light,
}

/// Sensor array configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// I/O pins of the sensor channels, left to right
    pub pins: ArrayVec<u8, MAX_SENSORS>,
    /// Pin driving the IR emitters, if they are switchable
    ///
    /// Descriptive only: the [`ReflectanceSensor`] implementation owns the
    /// emitter switch. The array never drives this pin; it is kept so a
    /// saved configuration records the wiring, and [`validate`](Self::validate)
    /// rejects it when it collides with a sensor pin.
    pub emitter_pin: Option<u8>,
    /// Discharge timeout in timer ticks (2000 ticks = 0.8 ms at 20 MHz)
    pub timeout_ticks: u16,
    /// Line colour
    pub line_color: LineColor,
    /// Calibrated values at or below this are ignored by the estimator
    pub noise_threshold: u16,
    /// At least one calibrated value must exceed this to be "on the line"
    pub on_line_threshold: u16,
    /// Raw reads per calibration record
    pub samples_per_calibration: u8,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            pins: [0, 1, 2, 4, 7, 8, 9, 10].into_iter().collect(),
            emitter_pin: Some(17),
            timeout_ticks: 2000,
            line_color: LineColor::Dark,
            noise_threshold: 50,
            on_line_threshold: 200,
            samples_per_calibration: 10,
        }
    }
}

impl SensorConfig {
    /// Create a config for the given channel pins
    pub fn new(pins: &[u8]) -> Self {
        Self {
            pins: pins.iter().copied().take(MAX_SENSORS).collect(),
            ..Default::default()
        }
    }

    /// Set the discharge timeout
    pub fn with_timeout(mut self, timeout_ticks: u16) -> Self {
        self.timeout_ticks = timeout_ticks;
        self
    }

    /// Set the emitter pin
    pub fn with_emitter_pin(mut self, pin: Option<u8>) -> Self {
        self.emitter_pin = pin;
        self
    }

    /// Set the line colour
    pub fn with_line_color(mut self, color: LineColor) -> Self {
        self.line_color = color;
        self
    }

    /// Number of sensors
    pub fn num_sensors(&self) -> usize {
        self.pins.len()
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.pins.is_empty() {
            return Err(Error::Config("sensor array needs at least one pin".into()));
        }
        if self.timeout_ticks == 0 {
            return Err(Error::Config("sensor timeout must be non-zero".into()));
        }
        if self.samples_per_calibration == 0 {
            return Err(Error::Config(
                "samples_per_calibration must be non-zero".into(),
            ));
        }
        if self.on_line_threshold < self.noise_threshold
            || self.on_line_threshold >= CALIBRATED_MAX
        {
            return Err(Error::Config(format!(
                "on_line_threshold {} must lie in [noise_threshold {}, {})",
                self.on_line_threshold, self.noise_threshold, CALIBRATED_MAX
            )));
        }
        for (i, pin) in self.pins.iter().enumerate() {
            if self.pins[..i].contains(pin) {
                return Err(Error::Config(format!("sensor pin {} used twice", pin)));
            }
        }
        if let Some(pin) = self.emitter_pin {
            if self.pins.contains(&pin) {
                return Err(Error::Config(format!(
                    "emitter pin {} is also a sensor pin",
                    pin
                )));
            }
        }
        Ok(())
    }
}

/// A bank of reflectance sensors with calibration and line estimation
///
/// # Example
/// ```
/// use linebot_core::hardware::ScriptedSensor;
/// use linebot_core::sensors::{CalibrationBounds, EmitterMode, SensorArray, SensorConfig};
///
/// let sensor = ScriptedSensor::new(8).with_frame(&[100, 100, 100, 1800, 1800, 100, 100, 100]);
/// let mut array = SensorArray::new(sensor, SensorConfig::default())?;
/// array.set_bounds(CalibrationBounds::from_pairs(&[(100, 1800); 8]))?;
///
/// let (reading, position) = array.read_line(EmitterMode::On);
/// assert_eq!(position.value(), 3500);
/// assert_eq!(reading[3], 1000);
/// # Ok::<(), linebot_core::Error>(())
/// ```
#[derive(Debug)]
pub struct SensorArray<S> {
    sensor: S,
    config: SensorConfig,
    bounds: CalibrationBounds,
    last_position: LinePosition,
    line_lost: bool,
}

impl<S: ReflectanceSensor> SensorArray<S> {
    /// Wrap a sensor bank, checking it matches the configuration
    pub fn new(sensor: S, config: SensorConfig) -> Result<Self> {
        config.validate()?;
        if sensor.num_channels() != config.num_sensors() {
            return Err(Error::Config(format!(
                "sensor bank has {} channels but {} pins are configured",
                sensor.num_channels(),
                config.num_sensors()
            )));
        }
        let n = config.num_sensors();
        Ok(Self {
            bounds: CalibrationBounds::new(n, config.timeout_ticks),
            last_position: LinePosition::center(n),
            line_lost: false,
            sensor,
            config,
        })
    }

    /// Number of sensors
    pub fn num_sensors(&self) -> usize {
        self.config.num_sensors()
    }

    /// Position of the line when it sits under the middle of the array
    pub fn center(&self) -> LinePosition {
        LinePosition::center(self.num_sensors())
    }

    /// The configuration
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Current calibration bounds
    pub fn bounds(&self) -> &CalibrationBounds {
        &self.bounds
    }

    /// Replace the calibration bounds (e.g. restored from a previous run)
    pub fn set_bounds(&mut self, bounds: CalibrationBounds) -> Result<()> {
        if bounds.len() != self.num_sensors() {
            return Err(Error::Config(format!(
                "bounds cover {} sensors, array has {}",
                bounds.len(),
                self.num_sensors()
            )));
        }
        self.bounds = bounds;
        Ok(())
    }

    /// Forget all calibration data
    pub fn reset_calibration(&mut self) {
        self.bounds = CalibrationBounds::new(self.num_sensors(), self.config.timeout_ticks);
    }

    /// Whether calibration data has been recorded
    pub fn is_calibrated(&self) -> bool {
        self.bounds.is_calibrated()
    }

    /// The most recent position estimate
    pub fn last_position(&self) -> LinePosition {
        self.last_position
    }

    /// The underlying sensor bank
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Mutable access to the underlying sensor bank
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    fn discharge(&mut self, emitters_on: bool) -> SensorReading {
        let mut values = SensorReading::zeros(self.num_sensors());
        self.sensor.set_emitters(emitters_on);
        self.sensor
            .read_discharge(self.config.timeout_ticks, values.values_mut());
        values
    }

    /// Raw discharge times, one per sensor
    pub fn read_raw(&mut self, mode: EmitterMode) -> SensorReading {
        match mode {
            EmitterMode::Off => self.discharge(false),
            EmitterMode::On => {
                let lit = self.discharge(true);
                self.sensor.set_emitters(false);
                lit
            }
            EmitterMode::OnAndOff => {
                let lit = self.discharge(true);
                let dark = self.discharge(false);
                let timeout = self.config.timeout_ticks as u32;
                lit.values()
                    .iter()
                    .zip(dark.values())
                    .map(|(&on, &off)| {
                        (on as u32 + timeout)
                            .saturating_sub(off as u32)
                            .min(u16::MAX as u32) as u16
                    })
                    .collect()
            }
        }
    }

    /// Take one calibration record
    ///
    /// Reads the array `samples_per_calibration` times and folds the batch
    /// into the bounds.
    pub fn calibrate(&mut self, mode: EmitterMode) {
        let samples: Vec<SensorReading> = (0..self.config.samples_per_calibration)
            .map(|_| self.read_raw(mode))
            .collect();
        self.bounds.record_batch(&samples);
    }

    /// Calibrated intensities in `[0, 1000]`, in surface orientation
    ///
    /// 0 is the lightest surface seen during calibration, 1000 the darkest.
    pub fn read_calibrated(&mut self, mode: EmitterMode) -> SensorReading {
        let raw = self.read_raw(mode);
        self.bounds.normalize_reading(&raw)
    }

    /// Calibrated intensities and the line-position estimate
    ///
    /// The returned reading is in line orientation: high values always mean
    /// "over the line", inverting the surface values for a light line. When
    /// the line is lost the position snaps to the edge it was last seen
    /// nearest.
    pub fn read_line(&mut self, mode: EmitterMode) -> (SensorReading, LinePosition) {
        let mut reading = self.read_calibrated(mode);
        if self.config.line_color == LineColor::Light {
            for value in reading.values_mut() {
                *value = CALIBRATED_MAX - *value;
            }
        }

        let estimate = estimate_position(
            reading.values(),
            self.last_position,
            self.config.noise_threshold,
            self.config.on_line_threshold,
        );

        if !estimate.on_line && !self.line_lost {
            tracing::warn!(
                "line lost, last seen at {}; holding {}",
                self.last_position,
                estimate.position
            );
        } else if estimate.on_line && self.line_lost {
            tracing::info!("line reacquired at {}", estimate.position);
        }
        self.line_lost = !estimate.on_line;
        if estimate.on_line {
            self.last_position = estimate.position;
        }

        (reading, estimate.position)
    }

    /// Sample the array with emitters on or off
    pub fn sample(&mut self, emitters_on: bool) -> (SensorReading, LinePosition) {
        self.read_line(EmitterMode::from_flag(emitters_on))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::ScriptedSensor;

    const LIGHT: [u16; 8] = [100; 8];
    const DARK: [u16; 8] = [1800; 8];

    fn calibrated_array(
        sensor: ScriptedSensor,
        config: SensorConfig,
    ) -> SensorArray<ScriptedSensor> {
        let mut array = SensorArray::new(sensor, config).unwrap();
        array
            .set_bounds(CalibrationBounds::from_pairs(&[(100, 1800); 8]))
            .unwrap();
        array
    }

    #[test]
    fn test_config_validation() {
        assert!(SensorConfig::default().validate().is_ok());
        assert!(SensorConfig::new(&[]).validate().is_err());
        assert!(SensorConfig::new(&[1, 2, 1]).validate().is_err());
        assert!(SensorConfig::new(&[1, 2, 17]).validate().is_err());
        assert!(SensorConfig::default().with_timeout(0).validate().is_err());
        assert!(SensorConfig::new(&[1, 2, 17])
            .with_emitter_pin(None)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_emitter_pin_is_not_driven() {
        // Emitter switching goes through the sensor bank regardless of the pin
        let without_pin = SensorConfig::default().with_emitter_pin(None);
        let mut array = SensorArray::new(ScriptedSensor::new(8), without_pin).unwrap();
        array.read_raw(EmitterMode::On);
        assert_eq!(array.sensor().emitter_log(), &[true, false]);

        let err = SensorConfig::default()
            .with_emitter_pin(Some(4))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("emitter pin 4")));
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let err = SensorArray::new(ScriptedSensor::new(6), SensorConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_emitters_on_switches_off_after_read() {
        let mut array = SensorArray::new(ScriptedSensor::new(8), SensorConfig::default()).unwrap();
        array.read_raw(EmitterMode::On);
        assert_eq!(array.sensor().emitter_log(), &[true, false]);
        assert!(!array.sensor().emitters_on());
    }

    #[test]
    fn test_on_and_off_cancels_ambient() {
        let sensor = ScriptedSensor::new(8)
            .with_frame(&[900; 8])
            .with_ambient(&[1500; 8]);
        let mut array = SensorArray::new(sensor, SensorConfig::default()).unwrap();

        let raw = array.read_raw(EmitterMode::OnAndOff);
        // 900 + 2000 - 1500
        assert_eq!(raw.values(), &[1400; 8]);
        assert_eq!(array.sensor().reads(), 2);
    }

    #[test]
    fn test_calibrate_reads_a_batch() {
        let sensor = ScriptedSensor::new(8).with_frame(&LIGHT).with_frame(&DARK);
        let mut array = SensorArray::new(sensor, SensorConfig::default()).unwrap();
        assert!(!array.is_calibrated());

        array.calibrate(EmitterMode::On);
        assert!(array.is_calibrated());
        assert_eq!(array.sensor().reads(), 10);
        assert_eq!(array.bounds().min(0), Some(1800));
        assert_eq!(array.bounds().max(0), Some(100));

        // Second record is all dark, lifting the maximum
        array.calibrate(EmitterMode::On);
        assert_eq!(array.bounds().max(0), Some(1800));
        assert_eq!(array.bounds().min(0), Some(1800));

        array.reset_calibration();
        assert!(!array.is_calibrated());
    }

    #[test]
    fn test_read_line_centered() {
        let sensor =
            ScriptedSensor::new(8).with_frame(&[100, 100, 100, 1800, 1800, 100, 100, 100]);
        let mut array = calibrated_array(sensor, SensorConfig::default());

        let (reading, position) = array.read_line(EmitterMode::On);
        assert_eq!(position, LinePosition::new(3500));
        assert_eq!(reading.values(), &[0, 0, 0, 1000, 1000, 0, 0, 0]);
    }

    #[test]
    fn test_read_line_light_line_inverts() {
        let sensor =
            ScriptedSensor::new(8).with_frame(&[1800, 1800, 1800, 1800, 1800, 1800, 1800, 100]);
        let config = SensorConfig::default().with_line_color(LineColor::Light);
        let mut array = calibrated_array(sensor, config);

        let (reading, position) = array.read_line(EmitterMode::On);
        assert_eq!(position.value(), 7000);
        assert_eq!(reading[7], 1000);
        assert_eq!(reading[0], 0);
    }

    #[test]
    fn test_lost_line_holds_last_edge() {
        let sensor = ScriptedSensor::new(8)
            .with_frame(&[100, 100, 100, 100, 100, 1800, 1800, 100])
            .with_frame(&LIGHT);
        let mut array = calibrated_array(sensor, SensorConfig::default());

        let (_, first) = array.read_line(EmitterMode::On);
        assert_eq!(first.value(), 5500);

        let (_, lost) = array.read_line(EmitterMode::On);
        assert_eq!(lost.value(), 7000);
        // The last on-line estimate is kept while the line stays lost
        assert_eq!(array.last_position().value(), 5500);

        let (_, still_lost) = array.sample(true);
        assert_eq!(still_lost.value(), 7000);
    }

    #[test]
    fn test_uncalibrated_array_reports_line_lost() {
        let sensor = ScriptedSensor::new(8).with_frame(&DARK);
        let mut array = SensorArray::new(sensor, SensorConfig::default()).unwrap();
        let (reading, position) = array.read_line(EmitterMode::On);
        assert_eq!(reading.values(), &[0; 8]);
        assert_eq!(position.value(), 7000);
    }
}
