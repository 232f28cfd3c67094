//! Kinematic line-track simulator
//!
//! A one-dimensional world: the only state is where the line crosses the
//! sensor array, in the same units as [`LinePosition`](crate::sensors::LinePosition).
//! Differential wheel power slides the line across the array, each sensor
//! sees a Gaussian reflectance profile around the line, and branch masks
//! paint edge sensors dark to fake junctions.
//!
//! The sensor bank, drivetrain and clock handles all share one world, so the
//! control core can be run unchanged against it.
//!
//! # Example
//! ```
//! use linebot_core::sim::{SimConfig, Simulation};
//! use linebot_core::{LineFollower, RobotConfig};
//!
//! let sim = Simulation::new(SimConfig::default());
//! let mut follower =
//!     LineFollower::new(&RobotConfig::default(), sim.sensor(), sim.drivetrain(), sim.clock())?;
//!
//! follower.calibrate()?;
//! let report = follower.cycle()?;
//! assert!((3300..=3700).contains(&report.position.value()));
//! # Ok::<(), linebot_core::Error>(())
//! ```

mod world;

pub use world::{SimClock, SimConfig, SimDrivetrain, SimSensor, SimWorld, Simulation};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ControlLoopConfig, LineFollower};
    use crate::hardware::{Clock, MotorCommand};
    use crate::policy::TurnAction;
    use crate::RobotConfig;

    type SimFollower = LineFollower<SimSensor, SimDrivetrain, SimClock>;

    fn calibrated(sim: &Simulation) -> SimFollower {
        let mut follower = LineFollower::new(
            &RobotConfig::default(),
            sim.sensor(),
            sim.drivetrain(),
            sim.clock(),
        )
        .unwrap();
        follower.calibrate().unwrap();
        follower
    }

    #[test]
    fn test_calibration_sweep_covers_every_sensor() {
        let sim = Simulation::new(SimConfig::default());
        let follower = calibrated(&sim);

        let bounds = follower.sensors().bounds();
        assert_eq!(bounds.degenerate_sensors().count(), 0);
        for i in 0..8 {
            let min = bounds.min(i).unwrap();
            let max = bounds.max(i).unwrap();
            assert!(min <= 110, "sensor {} min {}", i, min);
            assert!(max >= 1500, "sensor {} max {}", i, max);
        }

        // The sweep is symmetric, so the robot ends where it started
        assert!((sim.line_position() - 3500.0).abs() < 1.0);
        assert_eq!(sim.motor_history().last(), Some(&MotorCommand::STOP));
        assert_eq!(sim.motor_history().len(), 81);
    }

    #[test]
    fn test_follower_converges_to_center() {
        let sim = Simulation::new(SimConfig::default());
        let mut follower = calibrated(&sim);
        sim.set_line_position(5000.0);

        let mut last = None;
        follower
            .run(ControlLoopConfig::free_running(), |iteration, report| {
                last = Some(*report);
                iteration < 5000
            })
            .unwrap();

        let report = last.unwrap();
        assert!(
            (sim.line_position() - 3500.0).abs() < 300.0,
            "line settled at {}",
            sim.line_position()
        );
        assert!(report.powers.left >= 0 && report.powers.right >= 0);
        assert_eq!(report.action, TurnAction::DeadEndReverse);
    }

    #[test]
    fn test_left_branch_triggers_left_spin() {
        let sim = Simulation::new(SimConfig::default());
        let mut follower = calibrated(&sim);
        let before = sim.clock().elapsed_ms();

        sim.set_branches(true, false);
        let report = follower.cycle().unwrap();

        assert_eq!(report.action, TurnAction::Left);
        assert!(report.turned);
        assert!(sim.motor_history().contains(&MotorCommand::new(-90, 90)));
        assert!(sim.clock().elapsed_ms() >= before + 200);
    }

    #[test]
    fn test_right_branch_and_cross() {
        let sim = Simulation::new(SimConfig::default());
        let mut follower = calibrated(&sim);

        sim.set_branches(false, true);
        assert_eq!(follower.cycle().unwrap().action, TurnAction::Right);

        // Paint the whole array dark: left wins over right and through
        sim.set_line_position(3500.0);
        sim.set_branches(true, true);
        sim.set_full_width(true);
        let report = follower.cycle().unwrap();
        assert!(report.flags.tee);
        assert_eq!(report.action, TurnAction::Left);
    }

    #[test]
    fn test_lost_line_holds_edge() {
        let sim = Simulation::new(SimConfig::default());
        let mut follower = calibrated(&sim);

        sim.set_line_position(6200.0);
        follower.cycle().unwrap();
        sim.set_line_position(20_000.0);
        let report = follower.cycle().unwrap();

        assert_eq!(report.position.value(), 7000);
        assert_eq!(report.powers.right, 0);
    }
}
