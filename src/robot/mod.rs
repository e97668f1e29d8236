//! Motion coordination for the three-axis rig.
//!
//! [`Robot`] is the only component allowed to mutate persisted position or to
//! touch the actuation driver. Every accepted move is bounds-checked,
//! persisted before the pulses go out, and announced over the realtime
//! channel. Homing and whole-position moves fan out one thread per axis; the
//! per-axis position cells are atomics, so the axis-partitioned threads never
//! need a lock, and the join establishes the happens-before edge for the
//! caller's read-back.

pub mod driver;
pub mod position_store;

pub use driver::{ActuationDriver, Direction, SimulatedDriver, StepCommand};
pub use position_store::PositionStore;

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::{AxisSettings, Settings};
use crate::error::{ErrorKind, ProgramError};
use crate::realtime::{Event, RealtimeSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Robot {
    driver: Arc<dyn ActuationDriver>,
    sink: Arc<dyn RealtimeSink>,
    store: Mutex<PositionStore>,
    x: AtomicI64,
    y: AtomicI64,
    z: AtomicI64,
    settings: Settings,
}

impl Robot {
    /// Build the long-lived robot, restoring the last persisted position.
    pub fn new(
        settings: Settings,
        driver: Arc<dyn ActuationDriver>,
        sink: Arc<dyn RealtimeSink>,
    ) -> Self {
        let store = PositionStore::load(&settings.position_file);
        let robot = Robot {
            driver,
            sink,
            x: AtomicI64::new(store.get(Axis::X)),
            y: AtomicI64::new(store.get(Axis::Y)),
            z: AtomicI64::new(store.get(Axis::Z)),
            store: Mutex::new(store),
            settings,
        };
        let (x, y, z) = robot.positions();
        info!(x, y, z, "robot position restored");
        robot
    }

    fn cell(&self, axis: Axis) -> &AtomicI64 {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    fn axis_settings(&self, axis: Axis) -> &AxisSettings {
        match axis {
            Axis::X => &self.settings.axes.x,
            Axis::Y => &self.settings.axes.y,
            Axis::Z => &self.settings.axes.z,
        }
    }

    /// Wiring-corrected direction for one axis.
    fn physical(&self, axis: Axis, logical: Direction) -> Direction {
        if self.axis_settings(axis).invert_dir {
            logical.flipped()
        } else {
            logical
        }
    }

    pub fn position(&self, axis: Axis) -> i64 {
        self.cell(axis).load(Ordering::SeqCst)
    }

    pub fn positions(&self) -> (i64, i64, i64) {
        (
            self.position(Axis::X),
            self.position(Axis::Y),
            self.position(Axis::Z),
        )
    }

    /// Move one axis by a signed delta.
    ///
    /// The move is rejected before any actuation if it would leave the
    /// axis's reachable interval. On success the position is committed to
    /// memory and disk before the pulses go out, so a crash mid-pulse never
    /// leaves the recorded position behind the physical one.
    pub fn move_axis(&self, axis: Axis, delta: i64) -> Result<(), ProgramError> {
        let limits = self.axis_settings(axis);
        let current = self.position(axis);
        let target = current.saturating_add(delta);
        if target < limits.min || target > limits.max {
            return Err(ErrorKind::PositionLimit {
                axis,
                target,
                min: limits.min,
                max: limits.max,
            }
            .into());
        }

        self.cell(axis).store(target, Ordering::SeqCst);
        self.persist()?;

        let logical = if delta < 0 {
            Direction::Back
        } else {
            Direction::TowardEndstop
        };
        self.driver
            .step(axis, delta.unsigned_abs(), self.physical(axis, logical));

        debug!(%axis, delta, position = target, "axis moved");
        self.notify_position();
        Ok(())
    }

    /// Move to an absolute position, one axis after the other.
    ///
    /// Fail-fast: if one axis is rejected, the remaining axes are not
    /// attempted. Motion already committed stays committed.
    pub fn move_to(&self, x: i64, y: i64, z: i64) -> Result<(), ProgramError> {
        self.move_axis(Axis::X, x.saturating_sub(self.position(Axis::X)))?;
        self.move_axis(Axis::Y, y.saturating_sub(self.position(Axis::Y)))?;
        self.move_axis(Axis::Z, z.saturating_sub(self.position(Axis::Z)))?;
        Ok(())
    }

    /// Move every axis to its target concurrently, one thread per axis that
    /// actually has distance to cover. All targets are validated before any
    /// axis moves.
    pub fn move_all_simultaneously(&self, x: i64, y: i64, z: i64) -> Result<(), ProgramError> {
        let targets = [(Axis::X, x), (Axis::Y, y), (Axis::Z, z)];

        for (axis, target) in targets {
            let limits = self.axis_settings(axis);
            if target < limits.min || target > limits.max {
                return Err(ErrorKind::PositionLimit {
                    axis,
                    target,
                    min: limits.min,
                    max: limits.max,
                }
                .into());
            }
        }

        let mut deltas = Vec::new();
        for (axis, target) in targets {
            let delta = target.saturating_sub(self.position(axis));
            self.cell(axis).store(target, Ordering::SeqCst);
            if delta != 0 {
                deltas.push((axis, delta));
            }
        }
        self.persist()?;

        std::thread::scope(|scope| {
            for &(axis, delta) in &deltas {
                scope.spawn(move || {
                    let logical = if delta < 0 {
                        Direction::Back
                    } else {
                        Direction::TowardEndstop
                    };
                    self.driver
                        .step(axis, delta.unsigned_abs(), self.physical(axis, logical));
                });
            }
        });

        debug!(x, y, z, "all axes moved");
        self.notify_position();
        Ok(())
    }

    /// Home every axis against its limit switch, in parallel.
    ///
    /// Each axis drives toward its endstop until the switch trips, takes the
    /// trip point as zero, then backs off its configured step count. The
    /// caller observes one synchronous call; the position is persisted once
    /// after every axis thread has joined.
    pub fn home(&self) -> Result<(), ProgramError> {
        info!("homing all axes");

        let results: Vec<(Axis, Result<i64, ProgramError>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = Axis::ALL
                .iter()
                .map(|&axis| (axis, scope.spawn(move || self.home_axis(axis))))
                .collect();
            handles
                .into_iter()
                .map(|(axis, handle)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|_| Err(ProgramError::internal("homing thread panicked")));
                    (axis, result)
                })
                .collect()
        });

        let mut first_err = None;
        for (axis, result) in results {
            match result {
                Ok(position) => self.cell(axis).store(position, Ordering::SeqCst),
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }
        self.persist()?;

        if let Some(err) = first_err {
            return Err(err);
        }

        self.notify_position();
        info!("homing complete");
        Ok(())
    }

    fn home_axis(&self, axis: Axis) -> Result<i64, ProgramError> {
        // An already-pressed switch means the axis is sitting on its endstop;
        // driving further toward it would grind.
        if !self.driver.read_endstop(axis) {
            let tripped = self
                .driver
                .drive_until_endstop(axis, self.physical(axis, Direction::TowardEndstop));
            if !tripped {
                return Err(ProgramError::internal(format!(
                    "endstop on the {axis} axis never tripped"
                )));
            }
        }

        let backoff = self.axis_settings(axis).backoff_steps as u64;
        self.driver
            .step(axis, backoff, self.physical(axis, Direction::Back));
        Ok(-(backoff as i64))
    }

    /// Push the current position to the client. Called after every move and
    /// once for every freshly connected client.
    pub fn notify_position(&self) {
        let (x, y, z) = self.positions();
        self.sink.emit(Event::Coords {
            data: format!("X: {x}, Y: {y}, Z: {z}"),
        });
    }

    fn persist(&self) -> Result<(), ProgramError> {
        let (x, y, z) = self.positions();
        let mut store = self.store.lock().expect("position store poisoned");
        store.set(Axis::X, x);
        store.set(Axis::Y, y);
        store.set(Axis::Z, z);
        store
            .save()
            .map_err(|err| ProgramError::internal(format!("failed to persist position: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::RecordingSink;

    fn rig(dir: &std::path::Path) -> (Arc<Robot>, Arc<SimulatedDriver>, Arc<RecordingSink>) {
        let settings = Settings {
            position_file: dir.join("position.json"),
            ..Settings::default()
        };
        let driver = Arc::new(SimulatedDriver::new());
        let sink = Arc::new(RecordingSink::new());
        let robot = Arc::new(Robot::new(settings, driver.clone(), sink.clone()));
        (robot, driver, sink)
    }

    #[test]
    fn test_move_within_limits_updates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let (robot, driver, sink) = rig(dir.path());

        robot.move_axis(Axis::X, -500).unwrap();

        assert_eq!(robot.position(Axis::X), -500);
        assert_eq!(
            driver.commands(),
            vec![StepCommand {
                axis: Axis::X,
                steps: 500,
                direction: Direction::Back,
            }]
        );
        assert!(matches!(sink.events().as_slice(), [Event::Coords { .. }]));

        // Reload from disk to verify the accepted move was persisted.
        let reloaded = PositionStore::load(dir.path().join("position.json"));
        assert_eq!(reloaded.get(Axis::X), -500);
    }

    #[test]
    fn test_move_beyond_limit_is_rejected_without_actuation() {
        let dir = tempfile::tempdir().unwrap();
        let (robot, driver, sink) = rig(dir.path());

        let err = robot.move_axis(Axis::X, 1).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::PositionLimit { axis: Axis::X, .. }
        ));
        assert_eq!(robot.position(Axis::X), 0);
        assert!(driver.commands().is_empty());
        assert!(sink.events().is_empty());

        // Nothing was persisted either.
        let dirless = PositionStore::load(dir.path().join("position.json"));
        assert_eq!(dirless.get(Axis::X), 0);
    }

    #[test]
    fn test_y_axis_direction_is_inverted_by_wiring() {
        let dir = tempfile::tempdir().unwrap();
        let (robot, driver, _) = rig(dir.path());

        robot.move_axis(Axis::Y, -10).unwrap();

        // Logical "back" becomes physical "toward endstop" on Y.
        assert_eq!(
            driver.commands(),
            vec![StepCommand {
                axis: Axis::Y,
                steps: 10,
                direction: Direction::TowardEndstop,
            }]
        );
    }

    #[test]
    fn test_move_to_decomposes_sequentially_and_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let (robot, driver, _) = rig(dir.path());

        robot.move_to(-10, -20, -5).unwrap();
        assert_eq!(robot.positions(), (-10, -20, -5));
        let axes: Vec<Axis> = driver.commands().iter().map(|c| c.axis).collect();
        assert_eq!(axes, vec![Axis::X, Axis::Y, Axis::Z]);

        // Y target out of range: X is re-committed first, Z never attempted.
        let before = driver.commands().len();
        let err = robot.move_to(-15, 1, -50).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::PositionLimit { axis: Axis::Y, .. }
        ));
        assert_eq!(robot.position(Axis::X), -15);
        assert_eq!(robot.position(Axis::Z), -5);
        assert_eq!(driver.commands().len(), before + 1);
    }

    #[test]
    fn test_home_backs_off_and_persists_once_joined() {
        let dir = tempfile::tempdir().unwrap();
        let (robot, driver, sink) = rig(dir.path());

        robot.home().unwrap();

        let mut homed = driver.homed_axes();
        homed.sort_by_key(|a| a.as_str());
        assert_eq!(homed, vec![Axis::X, Axis::Y, Axis::Z]);

        // Position after homing is minus the configured back-off.
        assert_eq!(robot.position(Axis::X), -800);
        assert_eq!(robot.position(Axis::Y), -800);
        assert_eq!(robot.position(Axis::Z), -30_000);

        let reloaded = PositionStore::load(dir.path().join("position.json"));
        assert_eq!(reloaded.get(Axis::Z), -30_000);
        assert!(sink.events().iter().any(|e| matches!(e, Event::Coords { .. })));
    }

    #[test]
    fn test_move_all_simultaneously_validates_every_axis_first() {
        let dir = tempfile::tempdir().unwrap();
        let (robot, driver, _) = rig(dir.path());

        let err = robot.move_all_simultaneously(-10, -20, 5).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::PositionLimit { axis: Axis::Z, .. }
        ));
        assert_eq!(robot.positions(), (0, 0, 0));
        assert!(driver.commands().is_empty());

        robot.move_all_simultaneously(-10, 0, -5).unwrap();
        assert_eq!(robot.positions(), (-10, 0, -5));
        // Only axes with distance to cover got a pulse train.
        let mut axes: Vec<Axis> = driver.commands().iter().map(|c| c.axis).collect();
        axes.sort_by_key(|a| a.as_str());
        assert_eq!(axes, vec![Axis::X, Axis::Z]);
    }
}
