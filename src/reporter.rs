//! Central reporting of failed runs.
//!
//! Exactly one `execution_error` event leaves the process per failed run, so
//! the client never sees a cascade from one underlying failure. The reporter
//! is passed explicitly to whoever needs it; there is no global instance.

use std::sync::Arc;

use tracing::error;

use crate::error::ProgramError;
use crate::realtime::{Event, RealtimeSink};

pub struct ErrorReporter {
    sink: Arc<dyn RealtimeSink>,
}

impl ErrorReporter {
    pub fn new(sink: Arc<dyn RealtimeSink>) -> Self {
        ErrorReporter { sink }
    }

    /// Log the failure and push it to the client.
    pub fn report(&self, err: &ProgramError) {
        error!(
            block_id = ?err.block_id,
            code = err.code(),
            "execution failed: {err}"
        );
        self.sink.emit(Event::ExecutionError {
            error: err.to_string(),
            block_id: err.block_id.clone(),
            error_code: err.code().to_string(),
        });
    }

    /// Report a failure that escaped the taxonomy, such as a worker panic.
    pub fn report_internal(&self, message: impl Into<String>) {
        self.report(&ProgramError::internal(message));
    }
}
