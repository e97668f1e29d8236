//! Actuation driver contract.
//!
//! The driver is the last step before hardware: pulse generation and
//! limit-switch reads on the motor-controller pins live behind this trait.
//! Every call blocks until the requested physical action completes.

use std::sync::Mutex;

use tracing::trace;

use super::Axis;

/// Physical travel direction of an axis motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    TowardEndstop,
    Back,
}

impl Direction {
    pub fn flipped(self) -> Direction {
        match self {
            Direction::TowardEndstop => Direction::Back,
            Direction::Back => Direction::TowardEndstop,
        }
    }
}

pub trait ActuationDriver: Send + Sync {
    /// Issue `steps` pulses on one axis in the given direction.
    fn step(&self, axis: Axis, steps: u64, direction: Direction);

    /// Drive one axis until its limit switch trips. Returns whether the
    /// switch actually tripped.
    fn drive_until_endstop(&self, axis: Axis, direction: Direction) -> bool;

    /// Current limit-switch state for one axis.
    fn read_endstop(&self, axis: Axis) -> bool;
}

/// One recorded pulse train, for assertions and dry runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCommand {
    pub axis: Axis,
    pub steps: u64,
    pub direction: Direction,
}

/// Driver used when no motor hardware is attached: records every command
/// instead of pulsing pins. This is also the driver the CLI runs against.
#[derive(Default)]
pub struct SimulatedDriver {
    commands: Mutex<Vec<StepCommand>>,
    homed: Mutex<Vec<Axis>>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<StepCommand> {
        self.commands.lock().expect("driver log poisoned").clone()
    }

    pub fn homed_axes(&self) -> Vec<Axis> {
        self.homed.lock().expect("driver log poisoned").clone()
    }
}

impl ActuationDriver for SimulatedDriver {
    fn step(&self, axis: Axis, steps: u64, direction: Direction) {
        trace!(%axis, steps, ?direction, "simulated step");
        self.commands
            .lock()
            .expect("driver log poisoned")
            .push(StepCommand {
                axis,
                steps,
                direction,
            });
    }

    fn drive_until_endstop(&self, axis: Axis, direction: Direction) -> bool {
        trace!(%axis, ?direction, "simulated drive to endstop");
        self.homed.lock().expect("driver log poisoned").push(axis);
        true
    }

    fn read_endstop(&self, _axis: Axis) -> bool {
        false
    }
}
