//! Interpreter test suite: whole programs executed against a simulated rig.

mod variables;

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::config::Settings;
use crate::error::ProgramError;
use crate::interpreter::{engine, Context};
use crate::program::Loader;
use crate::realtime::RecordingSink;
use crate::robot::{Robot, SimulatedDriver};

/// A full rig around a temporary position file. The X axis gets headroom
/// above zero so programs can move in the positive direction too.
pub(crate) struct Harness {
    _dir: tempfile::TempDir,
    pub robot: Arc<Robot>,
    pub driver: Arc<SimulatedDriver>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings {
            position_file: dir.path().join("position.json"),
            ..Settings::default()
        };
        settings.axes.x.max = 100;
        let driver = Arc::new(SimulatedDriver::new());
        let sink = Arc::new(RecordingSink::new());
        let robot = Arc::new(Robot::new(settings, driver.clone(), sink.clone()));
        Harness {
            _dir: dir,
            robot,
            driver,
            sink,
        }
    }

    /// Load and run a program, returning the final context for read-back.
    pub fn run(&self, doc: JsonValue) -> (Result<(), ProgramError>, Context) {
        let loader = Loader::from_value(doc).unwrap();
        let (blocks, variables) = loader.into_parts();
        let mut ctx = Context::new(&variables, self.robot.clone(), self.sink.clone(), None);
        let result = engine::run(&blocks, &mut ctx);
        (result, ctx)
    }

    /// Load and run a program expected to fail.
    pub fn run_err(&self, doc: JsonValue) -> ProgramError {
        let (result, _) = self.run(doc);
        result.unwrap_err()
    }
}

/// Shorthand for a variable record.
pub(crate) fn var(name: &str, value: impl ToString) -> JsonValue {
    serde_json::json!({"text": name, "value": value.to_string()})
}

/// A calc block `target = a <op> b`. Each block declares its own variables
/// with initial values, the way the editor serializes them.
pub(crate) fn calc(
    id: &str,
    op_text: &str,
    target: (&str, i64),
    a: (&str, i64),
    b: (&str, i64),
) -> JsonValue {
    serde_json::json!({
        "id": id,
        "type": "block-calc",
        "text": format!("{} = {} {op_text} {}", target.0, a.0, b.0),
        "variables": [var(target.0, target.1), var(a.0, a.1), var(b.0, b.1)],
    })
}
