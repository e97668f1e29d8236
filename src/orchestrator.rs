//! Run lifecycle: at most one program executes at a time.
//!
//! The orchestrator owns the long-lived collaborators (robot, realtime sink,
//! optional measurement device) and hands each accepted program to a native
//! worker thread. A `Drop`-based guard releases the single-run flag on every
//! exit path, including panics, and a panic is reported to the client as an
//! internal error rather than silently swallowed.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::info;

use crate::error::{ErrorKind, ProgramError};
use crate::interpreter::{self, Context};
use crate::measurement::MeasurementCollector;
use crate::program::Loader;
use crate::realtime::RealtimeSink;
use crate::reporter::ErrorReporter;
use crate::robot::Robot;

pub struct RunOrchestrator {
    robot: Arc<Robot>,
    sink: Arc<dyn RealtimeSink>,
    collector: Option<Arc<dyn MeasurementCollector>>,
    running: Arc<AtomicBool>,
}

/// Handle to an in-flight run; join it to wait for completion.
#[derive(Debug)]
pub struct RunHandle {
    handle: JoinHandle<()>,
}

impl RunHandle {
    pub fn join(self) {
        // The worker reports its own failures; a panic is already handled
        // inside the thread, so the join result carries nothing.
        let _ = self.handle.join();
    }
}

/// Clears the running flag when the worker exits, however it exits.
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl RunOrchestrator {
    pub fn new(
        robot: Arc<Robot>,
        sink: Arc<dyn RealtimeSink>,
        collector: Option<Arc<dyn MeasurementCollector>>,
    ) -> Self {
        RunOrchestrator {
            robot,
            sink,
            collector,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Accept a serialized program and execute it on a worker thread.
    ///
    /// Refused with `ExecutionStarted` while another run is active; the
    /// in-flight run is not touched. The flag is claimed before the worker
    /// spawns, so two racing calls can never both be accepted.
    pub fn start(&self, document: String) -> Result<RunHandle, ProgramError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ErrorKind::ExecutionStarted.into());
        }

        let robot = Arc::clone(&self.robot);
        let sink = Arc::clone(&self.sink);
        let collector = self.collector.clone();
        let guard = RunGuard {
            running: Arc::clone(&self.running),
        };

        let handle = thread::Builder::new()
            .name("program-run".into())
            .spawn(move || {
                let _guard = guard;
                let reporter = ErrorReporter::new(Arc::clone(&sink));
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_document(&document, robot, sink, collector)
                }));
                match outcome {
                    Ok(Ok(())) => info!("run complete"),
                    Ok(Err(err)) => reporter.report(&err),
                    Err(_) => reporter.report_internal("run worker panicked"),
                }
            })
            .map_err(|err| {
                // Spawn failure: nothing ran, release the claim here since
                // the guard moved into the closure that never started.
                self.running.store(false, Ordering::SeqCst);
                ProgramError::internal(format!("failed to spawn run worker: {err}"))
            })?;

        Ok(RunHandle { handle })
    }
}

/// Parse, build the context and execute; one run end to end.
fn run_document(
    document: &str,
    robot: Arc<Robot>,
    sink: Arc<dyn RealtimeSink>,
    collector: Option<Arc<dyn MeasurementCollector>>,
) -> Result<(), ProgramError> {
    let loader = Loader::from_str(document)?;
    let (blocks, variables) = loader.into_parts();
    let mut ctx = Context::new(&variables, robot, sink, collector.clone());

    if let Some(collector) = &collector {
        collector.start()?;
    }
    let result = interpreter::run(&blocks, &mut ctx);
    if let Some(collector) = &collector {
        // A session is closed even after a failed run; the run's own error
        // stays the reported one.
        let stopped = collector.stop();
        return result.and(stopped);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::sync::Mutex;

    use crate::config::Settings;
    use crate::measurement::CountingCollector;
    use crate::realtime::{Event, RecordingSink};
    use crate::robot::SimulatedDriver;

    fn rig(
        dir: &std::path::Path,
        collector: Option<Arc<dyn MeasurementCollector>>,
    ) -> (RunOrchestrator, Arc<RecordingSink>) {
        let settings = Settings {
            position_file: dir.join("position.json"),
            ..Settings::default()
        };
        let sink = Arc::new(RecordingSink::new());
        let robot = Arc::new(Robot::new(
            settings,
            Arc::new(SimulatedDriver::new()),
            sink.clone(),
        ));
        (RunOrchestrator::new(robot, sink.clone(), collector), sink)
    }

    /// Collector whose collection pass blocks until the test releases it.
    struct GateCollector {
        release: Mutex<Receiver<()>>,
    }

    impl GateCollector {
        fn new() -> (Arc<Self>, Sender<()>) {
            let (tx, rx) = channel();
            (
                Arc::new(GateCollector {
                    release: Mutex::new(rx),
                }),
                tx,
            )
        }
    }

    impl MeasurementCollector for GateCollector {
        fn start(&self) -> Result<(), ProgramError> {
            Ok(())
        }

        fn run_one_collection(&self) -> Result<(), ProgramError> {
            let release = self.release.lock().expect("gate poisoned");
            let _ = release.recv();
            Ok(())
        }

        fn stop(&self) -> Result<(), ProgramError> {
            Ok(())
        }
    }

    const MEASURE_DOC: &str =
        r#"[{"id": "b1", "type": "block-measure", "text": "measure", "variables": []}]"#;

    #[test]
    fn test_second_start_is_refused_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let (collector, release) = GateCollector::new();
        let (orchestrator, sink) = rig(dir.path(), Some(collector));

        let handle = orchestrator.start(MEASURE_DOC.to_string()).unwrap();
        assert!(orchestrator.is_running());

        let err = orchestrator.start(MEASURE_DOC.to_string()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ExecutionStarted));

        release.send(()).unwrap();
        handle.join();

        assert!(!orchestrator.is_running());
        // The in-flight run finished untouched, without errors.
        assert!(!sink
            .events()
            .iter()
            .any(|e| matches!(e, Event::ExecutionError { .. })));
    }

    fn error_events(sink: &RecordingSink) -> Vec<Event> {
        sink.events()
            .into_iter()
            .filter(|e| matches!(e, Event::ExecutionError { .. }))
            .collect()
    }

    #[test]
    fn test_failed_run_reports_once_and_releases_guard() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, sink) = rig(dir.path(), None);

        // A positive X move from zero exceeds the default upper limit of 0.
        let doc = r#"[{"id": "block-steps-x-1", "type": "block-move", "text": "steps",
                       "variables": [{"text": "dx", "value": "5"}]}]"#;

        orchestrator.start(doc.to_string()).unwrap().join();

        assert!(!orchestrator.is_running());
        let errors = error_events(&sink);
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            Event::ExecutionError {
                error_code,
                block_id,
                ..
            } => {
                assert_eq!(error_code, "PositionLimit");
                assert_eq!(block_id.as_deref(), Some("block-steps-x-1"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_measurement_session_wraps_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let collector = Arc::new(CountingCollector::new());
        let (orchestrator, sink) = rig(dir.path(), Some(collector.clone()));

        orchestrator.start(MEASURE_DOC.to_string()).unwrap().join();

        assert_eq!(collector.collections(), 1);
        assert!(!sink
            .events()
            .iter()
            .any(|e| matches!(e, Event::ExecutionError { .. })));
    }

    #[test]
    fn test_measurement_without_device_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, sink) = rig(dir.path(), None);

        orchestrator.start(MEASURE_DOC.to_string()).unwrap().join();

        let errors = error_events(&sink);
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            Event::ExecutionError {
                error_code,
                block_id,
                ..
            } => {
                assert_eq!(error_code, "NoDeviceConnected");
                assert_eq!(block_id.as_deref(), Some("b1"));
            }
            _ => unreachable!(),
        }
    }
}
