//! Aggregated robot configuration
//!
//! Collects the configuration of every component in one serializable value.
//! Missing fields take the defaults, which reproduce the stock tuning for an
//! eight-sensor array.
//!
//! # Example
//! ```
//! use linebot_core::RobotConfig;
//!
//! let config = RobotConfig::from_json(r#"{ "pid": { "max_power": 120 } }"#)?;
//! assert_eq!(config.pid.max_power, 120);
//! assert_eq!(config.pid.kp_div, 20);
//! # Ok::<(), linebot_core::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationConfig;
use crate::control::{LinePidConfig, TurnConfig};
use crate::intersection::ClassifierConfig;
use crate::sensors::{LinePosition, SensorConfig};
use crate::{Error, Result};

/// Configuration of the whole robot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Sensor array
    pub sensors: SensorConfig,
    /// Calibration sweep
    pub calibration: CalibrationConfig,
    /// Intersection classifier
    pub classifier: ClassifierConfig,
    /// Line PID
    pub pid: LinePidConfig,
    /// Turn maneuvers
    pub turn: TurnConfig,
}

impl RobotConfig {
    /// Parse a configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Default configuration for a different sensor layout
    ///
    /// The PID setpoint follows the centre of the new array.
    pub fn for_sensor_pins(pins: &[u8]) -> Self {
        let sensors = SensorConfig::new(pins);
        let setpoint = LinePosition::center(sensors.num_sensors());
        Self {
            sensors,
            pid: LinePidConfig::default().with_setpoint(setpoint),
            ..Default::default()
        }
    }

    /// Validate every component and their consistency with each other
    pub fn validate(&self) -> Result<()> {
        self.sensors.validate()?;
        self.calibration.validate()?;
        self.classifier.validate()?;
        self.pid.validate()?;
        self.turn.validate()?;

        let n = self.sensors.num_sensors();
        let center = LinePosition::center(n);
        if self.pid.setpoint != center.value() {
            return Err(Error::Config(format!(
                "PID setpoint {} does not match the centre {} of a {}-sensor array",
                self.pid.setpoint, center, n
            )));
        }
        if self.classifier.edge_width > n {
            return Err(Error::Config(format!(
                "classifier edge width {} exceeds sensor count {}",
                self.classifier.edge_width, n
            )));
        }
        Ok(())
    }
}
