//! Reflectance sensor array
//!
//! Turns raw capacitor-discharge times into calibrated intensities on a
//! 0-1000 scale and a single weighted line-position estimate.

mod array;
mod bounds;
mod reading;

pub use array::{EmitterMode, LineColor, SensorArray, SensorConfig};
pub use bounds::CalibrationBounds;
pub use reading::{
    estimate_position, LinePosition, PositionEstimate, SensorReading, CALIBRATED_MAX,
    MAX_SENSORS, NUM_SENSORS, SENSOR_SPAN,
};
