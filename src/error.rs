//! Error taxonomy for program loading, interpretation and robot motion.
//!
//! Everything the client can observe as an `execution_error` event derives
//! from [`ProgramError`]: a structured kind, an optional originating block id
//! and a stable error code. Errors unwind the run immediately and are caught
//! once at the run boundary by the reporter.

use thiserror::Error;

use crate::robot::Axis;

/// The concrete failure, without block attribution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// A block was constructed with the wrong number of declared variables.
    #[error("expected {expected} variable(s) but got {found}")]
    ExpectedVariableCount { expected: usize, found: usize },

    /// The submitted document does not match the block record shape.
    #[error("malformed program document: {message}")]
    MalformedProgram { message: String },

    /// A variable was read as an integer but holds something else.
    #[error("variable '{name}' holds '{value}', which is not an integer")]
    NotAnInteger { name: String, value: String },

    /// A block referenced a variable that was never declared.
    #[error("variable '{name}' is not defined")]
    UndefinedVariable { name: String },

    /// A move would leave the physically reachable interval of an axis.
    #[error("target {target} exceeds the limits of the {axis} axis ({min}..={max})")]
    PositionLimit {
        axis: Axis,
        target: i64,
        min: i64,
        max: i64,
    },

    /// A motion block was executed without a usable delta or target.
    #[error("no movement value available for this block")]
    MissingDelta,

    /// No measurement device could be found during a device search.
    #[error("no measurement device found")]
    DeviceNotFound,

    /// A collection pass was requested but no device is connected.
    #[error("no measurement device connected")]
    NoDeviceConnected,

    /// A run was requested while another run is still active.
    #[error("a program is already being executed")]
    ExecutionStarted,

    /// Anything outside the taxonomy; reported with a generic code.
    #[error("{message}")]
    Internal { message: String },
}

impl ErrorKind {
    /// Stable wire code for the `execution_error` payload.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ExpectedVariableCount { .. } => "ExpectedVariableCount",
            ErrorKind::MalformedProgram { .. } => "MalformedProgram",
            ErrorKind::NotAnInteger { .. } => "NotAnInteger",
            ErrorKind::UndefinedVariable { .. } => "UndefinedVariable",
            ErrorKind::PositionLimit { .. } => "PositionLimit",
            ErrorKind::MissingDelta => "MissingDelta",
            ErrorKind::DeviceNotFound => "DeviceNotFound",
            ErrorKind::NoDeviceConnected => "NoDeviceConnected",
            ErrorKind::ExecutionStarted => "ExecutionStarted",
            ErrorKind::Internal { .. } => "InternalError",
        }
    }

    /// Attach a block id, producing a full [`ProgramError`].
    pub fn at_block(self, block_id: impl Into<String>) -> ProgramError {
        ProgramError {
            kind: self,
            block_id: Some(block_id.into()),
        }
    }
}

/// A failure plus the block it originated from, when known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ProgramError {
    pub kind: ErrorKind,
    pub block_id: Option<String>,
}

impl ProgramError {
    pub fn internal(message: impl Into<String>) -> Self {
        ErrorKind::Internal {
            message: message.into(),
        }
        .into()
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Attribute this error to a block unless an inner block already claimed
    /// it. The engine calls this while unwinding, so the innermost failing
    /// block wins.
    pub fn or_at_block(mut self, block_id: &str) -> Self {
        if self.block_id.is_none() {
            self.block_id = Some(block_id.to_string());
        }
        self
    }
}

impl From<ErrorKind> for ProgramError {
    fn from(kind: ErrorKind) -> Self {
        ProgramError {
            kind,
            block_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_block_attribution_wins() {
        let err = ErrorKind::MissingDelta.at_block("block-steps-x-1");
        let err = err.or_at_block("block-repeat-0");
        assert_eq!(err.block_id.as_deref(), Some("block-steps-x-1"));
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorKind::ExecutionStarted.code(), "ExecutionStarted");
        assert_eq!(
            ProgramError::internal("boom").code(),
            "InternalError"
        );
    }
}
