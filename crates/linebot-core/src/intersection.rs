//! Intersection detection
//!
//! Thresholds a line-oriented calibrated reading to find exits: a run of
//! dark sensors on the left edge, on the right edge, or across the whole
//! array. There is no hysteresis; a single noisy sample can flip a flag.

use serde::{Deserialize, Serialize};

use crate::sensors::{SensorReading, CALIBRATED_MAX};
use crate::{Error, Result};

/// Exits detected in one reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExitFlags {
    /// Exit to the left
    pub left: bool,
    /// Exit to the right
    pub right: bool,
    /// Full-width crossing (tee or cross)
    pub tee: bool,
}

impl ExitFlags {
    /// No exits at all
    pub const NONE: Self = Self {
        left: false,
        right: false,
        tee: false,
    };

    /// Create exit flags
    pub const fn new(left: bool, right: bool, tee: bool) -> Self {
        Self { left, right, tee }
    }

    /// Whether any exit was detected
    pub fn any(&self) -> bool {
        self.left || self.right || self.tee
    }
}

/// Classifier configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// A sensor counts as "over the line" strictly above this value
    pub threshold: u16,
    /// Number of edge sensors that must all see the line for a side exit
    pub edge_width: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: 700,
            edge_width: 3,
        }
    }
}

impl ClassifierConfig {
    /// Set the threshold
    pub fn with_threshold(mut self, threshold: u16) -> Self {
        self.threshold = threshold;
        self
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.threshold >= CALIBRATED_MAX {
            return Err(Error::Config(format!(
                "classifier threshold {} must be below {}",
                self.threshold, CALIBRATED_MAX
            )));
        }
        if self.edge_width == 0 {
            return Err(Error::Config("classifier edge width must be non-zero".into()));
        }
        Ok(())
    }
}

/// Threshold-based exit classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct IntersectionClassifier {
    config: ClassifierConfig,
}

impl IntersectionClassifier {
    /// Create a classifier
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Flag the exits visible in a reading
    ///
    /// - `left`: the first `edge_width` sensors are all above the threshold
    /// - `right`: the last `edge_width` sensors are all above the threshold
    /// - `tee`: every sensor is above the threshold
    ///
    /// Readings narrower than `edge_width`, and empty readings, report no
    /// exits.
    pub fn classify(&self, reading: &SensorReading) -> ExitFlags {
        let values = reading.values();
        let width = self.config.edge_width;
        if values.is_empty() || values.len() < width {
            return ExitFlags::NONE;
        }

        let dark = |v: &u16| *v > self.config.threshold;
        ExitFlags {
            left: values[..width].iter().all(dark),
            right: values[values.len() - width..].iter().all(dark),
            tee: values.iter().all(dark),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(values: &[u16]) -> ExitFlags {
        IntersectionClassifier::default().classify(&SensorReading::from_slice(values))
    }

    #[test]
    fn test_straight_line_has_no_exits() {
        assert_eq!(classify(&[0, 0, 0, 1000, 1000, 0, 0, 0]), ExitFlags::NONE);
    }

    #[test]
    fn test_left_exit() {
        let flags = classify(&[900, 800, 701, 1000, 1000, 0, 0, 0]);
        assert_eq!(flags, ExitFlags::new(true, false, false));
    }

    #[test]
    fn test_right_exit() {
        let flags = classify(&[0, 0, 0, 1000, 1000, 1000, 1000, 1000]);
        assert_eq!(flags, ExitFlags::new(false, true, false));
    }

    #[test]
    fn test_full_width_sets_all_flags() {
        let flags = classify(&[1000; 8]);
        assert_eq!(flags, ExitFlags::new(true, true, true));
        assert!(flags.any());
    }

    #[test]
    fn test_threshold_is_strict() {
        let flags = classify(&[700, 1000, 1000, 0, 0, 1000, 1000, 700]);
        assert_eq!(flags, ExitFlags::NONE);
    }

    #[test]
    fn test_one_gap_blocks_tee() {
        let flags = classify(&[1000, 1000, 1000, 1000, 100, 1000, 1000, 1000]);
        assert_eq!(flags, ExitFlags::new(true, true, false));
    }

    #[test]
    fn test_narrow_and_empty_readings() {
        assert_eq!(classify(&[]), ExitFlags::NONE);
        assert_eq!(classify(&[1000, 1000]), ExitFlags::NONE);
        assert_eq!(classify(&[1000, 1000, 1000]), ExitFlags::new(true, true, true));
    }

    #[test]
    fn test_raising_threshold_only_clears_flags() {
        let readings: [[u16; 8]; 4] = [
            [1000; 8],
            [950, 820, 760, 300, 200, 710, 880, 990],
            [701, 702, 703, 704, 705, 706, 707, 708],
            [0, 1000, 1000, 1000, 1000, 1000, 1000, 0],
        ];
        for values in readings {
            let reading = SensorReading::from_slice(&values);
            let mut previous = ExitFlags::new(true, true, true);
            for threshold in (0..1000).step_by(25) {
                let classifier = IntersectionClassifier::new(
                    ClassifierConfig::default().with_threshold(threshold),
                )
                .unwrap();
                let flags = classifier.classify(&reading);
                assert!(!flags.left || previous.left);
                assert!(!flags.right || previous.right);
                assert!(!flags.tee || previous.tee);
                previous = flags;
            }
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(ClassifierConfig::default().validate().is_ok());
        assert!(ClassifierConfig::default()
            .with_threshold(1000)
            .validate()
            .is_err());
        let zero_width = ClassifierConfig {
            edge_width: 0,
            ..Default::default()
        };
        assert!(IntersectionClassifier::new(zero_width).is_err());
    }
}
