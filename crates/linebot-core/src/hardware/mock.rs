//! Recording and scripted peripherals for testing without hardware

use std::collections::VecDeque;

use super::traits::{Clock, Drivetrain, MotorCommand, ReflectanceSensor};
use crate::{Error, Result};

/// A drivetrain that records every command it receives
#[derive(Debug, Default)]
pub struct RecordingDrivetrain {
    commands: Vec<MotorCommand>,
    fail_with: Option<String>,
}

impl RecordingDrivetrain {
    /// Create a new recording drivetrain
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent command fail with the given message
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// All commands received so far, oldest first
    pub fn commands(&self) -> &[MotorCommand] {
        &self.commands
    }

    /// The most recent command
    pub fn last(&self) -> Option<MotorCommand> {
        self.commands.last().copied()
    }

    /// Forget the recorded commands
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Drivetrain for RecordingDrivetrain {
    fn set_motors(&mut self, command: MotorCommand) -> Result<()> {
        if let Some(ref message) = self.fail_with {
            return Err(Error::Hardware(message.clone()));
        }
        self.commands.push(command);
        Ok(())
    }
}

/// A clock that only advances when asked to delay
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: u64,
    delays: Vec<u32>,
}

impl ManualClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in milliseconds
    pub fn delays(&self) -> &[u32] {
        &self.delays
    }
}

impl Clock for ManualClock {
    fn delay_ms(&mut self, ms: u32) {
        self.now_ms += ms as u64;
        self.delays.push(ms);
    }

    fn elapsed_ms(&self) -> u64 {
        self.now_ms
    }
}

/// A sensor bank that replays scripted discharge times
///
/// Lit frames are consumed one per read while the emitters are on; the last
/// frame repeats once the script runs out. Reads with the emitters off return
/// the ambient frame if one is set, otherwise they follow the lit script.
#[derive(Debug)]
pub struct ScriptedSensor {
    channels: usize,
    frames: VecDeque<Vec<u16>>,
    last: Vec<u16>,
    ambient: Option<Vec<u16>>,
    emitters_on: bool,
    emitter_log: Vec<bool>,
    reads: usize,
}

impl ScriptedSensor {
    /// Create a scripted bank whose channels all read zero
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            frames: VecDeque::new(),
            last: vec![0; channels],
            ambient: None,
            emitters_on: false,
            emitter_log: Vec::new(),
            reads: 0,
        }
    }

    /// Queue a lit frame
    ///
    /// # Panics
    /// Panics if the frame length differs from the channel count
    pub fn push_frame(&mut self, frame: &[u16]) {
        assert_eq!(frame.len(), self.channels, "frame length must match channel count");
        self.frames.push_back(frame.to_vec());
    }

    /// Builder form of [`push_frame`](Self::push_frame)
    pub fn with_frame(mut self, frame: &[u16]) -> Self {
        self.push_frame(frame);
        self
    }

    /// Set the frame returned while the emitters are off
    pub fn with_ambient(mut self, frame: &[u16]) -> Self {
        assert_eq!(frame.len(), self.channels, "frame length must match channel count");
        self.ambient = Some(frame.to_vec());
        self
    }

    /// Every emitter switch requested so far
    pub fn emitter_log(&self) -> &[bool] {
        &self.emitter_log
    }

    /// Whether the emitters are currently on
    pub fn emitters_on(&self) -> bool {
        self.emitters_on
    }

    /// Number of discharge reads performed
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl ReflectanceSensor for ScriptedSensor {
    fn num_channels(&self) -> usize {
        self.channels
    }

    fn set_emitters(&mut self, on: bool) {
        self.emitters_on = on;
        self.emitter_log.push(on);
    }

    fn read_discharge(&mut self, timeout_ticks: u16, out: &mut [u16]) {
        self.reads += 1;
        let frame = match (&self.ambient, self.emitters_on) {
            (Some(ambient), false) => ambient.clone(),
            _ => {
                if let Some(next) = self.frames.pop_front() {
                    self.last = next;
                }
                self.last.clone()
            }
        };
        for (slot, value) in out.iter_mut().zip(frame) {
            *slot = value.min(timeout_ticks);
        }
    }
}
