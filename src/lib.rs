pub mod cli;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod measurement;
pub mod orchestrator;
pub mod program;
pub mod realtime;
pub mod reporter;
pub mod robot;

// Re-export main types
pub use error::{ErrorKind, ProgramError};
pub use interpreter::{Context, Control, Variable};
pub use orchestrator::{RunHandle, RunOrchestrator};
pub use program::{BlockKind, BlockNode, Loader};
pub use realtime::{Event, RealtimeSink};
pub use robot::{Axis, Robot};
