//! Per-run execution context.
//!
//! Aggregates the flattened variable table plus the handles a block needs:
//! the long-lived robot, the realtime sink and (optionally) the measurement
//! collector. Rebuilt for every run, never persisted.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ErrorKind, ProgramError};
use crate::measurement::MeasurementCollector;
use crate::realtime::{Event, RealtimeSink};
use crate::robot::{Axis, Robot};

use super::variable::Variable;

pub struct Context {
    variables: HashMap<String, Variable>,
    robot: Arc<Robot>,
    sink: Arc<dyn RealtimeSink>,
    collector: Option<Arc<dyn MeasurementCollector>>,
}

impl Context {
    pub fn new(
        declared: &[Variable],
        robot: Arc<Robot>,
        sink: Arc<dyn RealtimeSink>,
        collector: Option<Arc<dyn MeasurementCollector>>,
    ) -> Self {
        let variables = Self::resolve_all(declared);
        let mut names: Vec<&str> = variables.keys().map(String::as_str).collect();
        names.sort_unstable();
        debug!(?names, "variables resolved");
        Context {
            variables,
            robot,
            sink,
            collector,
        }
    }

    /// Collapse the declared variables into a unique-by-name table.
    ///
    /// `declared` comes from the loader in traversal order (children before
    /// the declaring node itself), and later declarations overwrite earlier
    /// ones with the same name. The visual editor has a single global
    /// namespace, not lexical scoping, so this shadowing is by design.
    pub fn resolve_all(declared: &[Variable]) -> HashMap<String, Variable> {
        let mut table = HashMap::new();
        for var in declared {
            table.insert(var.name().to_string(), var.clone());
        }
        table
    }

    fn reserved_axis(name: &str) -> Option<Axis> {
        match name {
            "X" => Some(Axis::X),
            "Y" => Some(Axis::Y),
            "Z" => Some(Axis::Z),
            _ => None,
        }
    }

    /// Look up a variable by name.
    ///
    /// `X`, `Y` and `Z` are reserved: every read synthesizes a fresh cell
    /// from the robot's position at this instant, never a stale snapshot.
    /// An undeclared name is a tooling error and fails loudly.
    pub fn get_variable(&self, name: &str) -> Result<Variable, ProgramError> {
        if let Some(axis) = Self::reserved_axis(name) {
            return Ok(Variable::new(name, self.robot.position(axis).to_string()));
        }
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| {
                ErrorKind::UndefinedVariable {
                    name: name.to_string(),
                }
                .into()
            })
    }

    pub fn int_value(&self, name: &str) -> Result<i64, ProgramError> {
        self.get_variable(name)?.to_int()
    }

    pub fn text_value(&self, name: &str) -> Result<String, ProgramError> {
        Ok(self.get_variable(name)?.raw_value().to_string())
    }

    /// Overwrite a variable's value; visible to every later reader of that
    /// name within the run.
    pub fn set_int(&mut self, name: &str, value: i64) -> Result<(), ProgramError> {
        if Self::reserved_axis(name).is_some() {
            return Err(ProgramError::internal(format!(
                "the axis variable '{name}' cannot be assigned"
            )));
        }
        match self.variables.get_mut(name) {
            Some(var) => {
                var.set_raw(value.to_string());
                Ok(())
            }
            None => Err(ErrorKind::UndefinedVariable {
                name: name.to_string(),
            }
            .into()),
        }
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn emit(&self, event: Event) {
        self.sink.emit(event);
    }

    pub fn collector(&self) -> Option<&Arc<dyn MeasurementCollector>> {
        self.collector.as_ref()
    }
}
