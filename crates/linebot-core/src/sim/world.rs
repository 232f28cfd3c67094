//! Simulated world and the hardware handles that share it

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::hardware::{Clock, Drivetrain, MotorCommand, ReflectanceSensor};
use crate::sensors::{NUM_SENSORS, SENSOR_SPAN};
use crate::Result;

/// Simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of simulated sensors
    pub num_sensors: usize,
    /// Initial line position under the array
    pub initial_line_position: f64,
    /// Width of the line's reflectance profile, in position units
    pub line_width: f64,
    /// Discharge time over bare floor
    pub floor_ticks: u16,
    /// Discharge time directly over the line
    pub line_ticks: u16,
    /// Discharge time with the emitters off
    pub ambient_ticks: u16,
    /// Line displacement per unit of wheel power difference per millisecond
    pub steer_gain: f64,
    /// Constant line drift per millisecond (track curvature)
    pub drift_per_ms: f64,
    /// Time one discharge read takes, in milliseconds
    pub read_time_ms: f64,
    /// Most motor commands kept in the history; older ones are dropped
    pub motor_history_limit: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_sensors: NUM_SENSORS,
            initial_line_position: 3500.0,
            line_width: 600.0,
            floor_ticks: 100,
            line_ticks: 1800,
            ambient_ticks: 1900,
            steer_gain: 0.05,
            drift_per_ms: 0.0,
            read_time_ms: 1.0,
            motor_history_limit: 1024,
        }
    }
}

impl SimConfig {
    /// Set the initial line position
    pub fn with_line_position(mut self, position: f64) -> Self {
        self.initial_line_position = position;
        self
    }

    /// Set the track drift
    pub fn with_drift(mut self, drift_per_ms: f64) -> Self {
        self.drift_per_ms = drift_per_ms;
        self
    }

    /// Set how many motor commands the history keeps (0 disables recording)
    pub fn with_motor_history_limit(mut self, limit: usize) -> Self {
        self.motor_history_limit = limit;
        self
    }
}

/// State of the simulated world
#[derive(Debug, Clone)]
pub struct SimWorld {
    config: SimConfig,
    line_position: f64,
    motors: MotorCommand,
    motor_history: VecDeque<MotorCommand>,
    time_ms: f64,
    emitters_on: bool,
    left_branch: bool,
    right_branch: bool,
    full_width: bool,
}

impl SimWorld {
    /// Create a world from a configuration
    pub fn new(config: SimConfig) -> Self {
        Self {
            line_position: config.initial_line_position,
            motors: MotorCommand::STOP,
            motor_history: VecDeque::new(),
            time_ms: 0.0,
            emitters_on: false,
            left_branch: false,
            right_branch: false,
            full_width: false,
            config,
        }
    }

    /// Advance time with the current motor command
    ///
    /// Driving the left wheel faster turns the robot right, which slides the
    /// line toward the low-index (left) sensors.
    pub fn advance(&mut self, ms: f64) {
        let steer = self.config.steer_gain * self.motors.differential() as f64;
        self.line_position += (self.config.drift_per_ms - steer) * ms;
        self.time_ms += ms;
    }

    /// Discharge time of one sensor under the current conditions
    pub fn discharge(&self, index: usize) -> u16 {
        if !self.emitters_on {
            return self.config.ambient_ticks;
        }

        let edge = 3.min(self.config.num_sensors);
        let painted = self.full_width
            || (self.left_branch && index < edge)
            || (self.right_branch && index >= self.config.num_sensors - edge);
        if painted {
            return self.config.line_ticks;
        }

        let sensor_position = index as f64 * SENSOR_SPAN as f64;
        let distance = (sensor_position - self.line_position) / self.config.line_width;
        let intensity = (-distance * distance).exp();
        let floor = self.config.floor_ticks as f64;
        let line = self.config.line_ticks as f64;
        (floor + (line - floor) * intensity).round() as u16
    }

    /// Apply a motor command, recording it in the bounded history
    pub fn apply(&mut self, command: MotorCommand) {
        self.motors = command;
        let limit = self.config.motor_history_limit;
        if limit == 0 {
            return;
        }
        while self.motor_history.len() >= limit {
            self.motor_history.pop_front();
        }
        self.motor_history.push_back(command);
    }

    /// Current line position under the array
    pub fn line_position(&self) -> f64 {
        self.line_position
    }

    /// Motor command currently applied
    pub fn motors(&self) -> MotorCommand {
        self.motors
    }

    /// Simulated time in milliseconds
    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }
}

/// Handle to a shared simulated world
///
/// Cloning the handle shares the world.
#[derive(Debug, Clone)]
pub struct Simulation {
    world: Arc<Mutex<SimWorld>>,
}

impl Simulation {
    /// Create a new simulation
    pub fn new(config: SimConfig) -> Self {
        Self {
            world: Arc::new(Mutex::new(SimWorld::new(config))),
        }
    }

    /// A sensor bank reading from this world
    pub fn sensor(&self) -> SimSensor {
        SimSensor {
            world: Arc::clone(&self.world),
        }
    }

    /// A drivetrain acting on this world
    pub fn drivetrain(&self) -> SimDrivetrain {
        SimDrivetrain {
            world: Arc::clone(&self.world),
        }
    }

    /// A clock advancing this world
    pub fn clock(&self) -> SimClock {
        SimClock {
            world: Arc::clone(&self.world),
        }
    }

    /// Current line position under the array
    pub fn line_position(&self) -> f64 {
        self.world.lock().line_position
    }

    /// Move the line (e.g. to start off-centre or to lose it)
    pub fn set_line_position(&self, position: f64) {
        self.world.lock().line_position = position;
    }

    /// Paint the three edge sensors on either side dark
    pub fn set_branches(&self, left: bool, right: bool) {
        let mut world = self.world.lock();
        world.left_branch = left;
        world.right_branch = right;
    }

    /// Paint every sensor dark
    pub fn set_full_width(&self, full_width: bool) {
        self.world.lock().full_width = full_width;
    }

    /// The most recent motor commands, oldest first
    ///
    /// At most `motor_history_limit` commands are kept.
    pub fn motor_history(&self) -> Vec<MotorCommand> {
        self.world.lock().motor_history.iter().copied().collect()
    }

    /// A snapshot of the world
    pub fn snapshot(&self) -> SimWorld {
        self.world.lock().clone()
    }
}

/// Simulated sensor bank
#[derive(Debug, Clone)]
pub struct SimSensor {
    world: Arc<Mutex<SimWorld>>,
}

impl ReflectanceSensor for SimSensor {
    fn num_channels(&self) -> usize {
        self.world.lock().config.num_sensors
    }

    fn set_emitters(&mut self, on: bool) {
        self.world.lock().emitters_on = on;
    }

    fn read_discharge(&mut self, timeout_ticks: u16, out: &mut [u16]) {
        let mut world = self.world.lock();
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = world.discharge(i).min(timeout_ticks);
        }
        let read_time = world.config.read_time_ms;
        world.advance(read_time);
    }
}

/// Simulated drivetrain
#[derive(Debug, Clone)]
pub struct SimDrivetrain {
    world: Arc<Mutex<SimWorld>>,
}

impl Drivetrain for SimDrivetrain {
    fn set_motors(&mut self, command: MotorCommand) -> Result<()> {
        self.world.lock().apply(command.clamped());
        Ok(())
    }
}

/// Simulated clock; delays advance the world instead of sleeping
#[derive(Debug, Clone)]
pub struct SimClock {
    world: Arc<Mutex<SimWorld>>,
}

impl Clock for SimClock {
    fn delay_ms(&mut self, ms: u32) {
        self.world.lock().advance(ms as f64);
    }

    fn elapsed_ms(&self) -> u64 {
        self.world.lock().time_ms as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_profile_peaks_under_line() {
        let sim = Simulation::new(SimConfig::default().with_line_position(3000.0));
        let mut sensor = sim.sensor();
        sensor.set_emitters(true);

        let mut out = [0u16; 8];
        sensor.read_discharge(2000, &mut out);
        assert_eq!(out[3], 1800);
        assert_eq!(out[0], 100);
        assert!(out[2] > out[1]);
        assert_eq!(out[2], out[4]);
    }

    #[test]
    fn test_emitters_off_reads_ambient() {
        let sim = Simulation::new(SimConfig::default());
        let mut sensor = sim.sensor();
        sensor.set_emitters(false);

        let mut out = [0u16; 8];
        sensor.read_discharge(2000, &mut out);
        assert_eq!(out, [1900; 8]);

        sensor.read_discharge(1500, &mut out);
        assert_eq!(out, [1500; 8]);
    }

    #[test]
    fn test_steering_moves_line() {
        let sim = Simulation::new(SimConfig::default());
        let mut drive = sim.drivetrain();
        let mut clock = sim.clock();

        // Spinning right slides the line to the left
        drive.set_motors(MotorCommand::spin_right(90)).unwrap();
        clock.delay_ms(100);
        assert_relative_eq!(sim.line_position(), 3500.0 - 0.05 * 180.0 * 100.0);
        assert_eq!(clock.elapsed_ms(), 100);

        drive.set_motors(MotorCommand::spin_left(90)).unwrap();
        clock.delay_ms(100);
        assert_relative_eq!(sim.line_position(), 3500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_drift_and_read_time() {
        let sim = Simulation::new(SimConfig::default().with_drift(2.0));
        let mut sensor = sim.sensor();
        let mut out = [0u16; 8];
        for _ in 0..10 {
            sensor.read_discharge(2000, &mut out);
        }
        assert_relative_eq!(sim.line_position(), 3520.0);
        assert_relative_eq!(sim.snapshot().time_ms(), 10.0);
    }

    #[test]
    fn test_branch_masks() {
        let sim = Simulation::new(SimConfig::default());
        sim.set_branches(true, false);
        let mut sensor = sim.sensor();
        sensor.set_emitters(true);

        let mut out = [0u16; 8];
        sensor.read_discharge(2000, &mut out);
        assert_eq!(&out[..3], &[1800; 3]);
        assert!(out[7] < 200);

        sim.set_branches(false, false);
        sim.set_full_width(true);
        sensor.read_discharge(2000, &mut out);
        assert_eq!(out, [1800; 8]);
    }

    #[test]
    fn test_commands_are_clamped_and_recorded() {
        let sim = Simulation::new(SimConfig::default());
        let mut drive = sim.drivetrain();
        drive.set_motors(MotorCommand::new(400, 10)).unwrap();
        drive.stop().unwrap();
        assert_eq!(
            sim.motor_history(),
            vec![MotorCommand::new(255, 10), MotorCommand::STOP]
        );
    }

    #[test]
    fn test_motor_history_is_bounded() {
        let sim = Simulation::new(SimConfig::default().with_motor_history_limit(3));
        let mut drive = sim.drivetrain();
        for power in 1..=5 {
            drive.set_motors(MotorCommand::new(power, power)).unwrap();
        }
        assert_eq!(
            sim.motor_history(),
            vec![
                MotorCommand::new(3, 3),
                MotorCommand::new(4, 4),
                MotorCommand::new(5, 5)
            ]
        );
        // The latest command still drives the world
        assert_eq!(sim.snapshot().motors(), MotorCommand::new(5, 5));

        let silent = Simulation::new(SimConfig::default().with_motor_history_limit(0));
        let mut drive = silent.drivetrain();
        drive.set_motors(MotorCommand::spin_right(90)).unwrap();
        assert!(silent.motor_history().is_empty());
        assert_eq!(silent.snapshot().motors(), MotorCommand::spin_right(90));
    }
}
