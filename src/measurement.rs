//! Contract for the external measurement device.
//!
//! The device itself (discovery, transport, data format) lives outside this
//! crate; the interpreter only needs a handle it can ask for one collection
//! pass per Measurement block. A run without a connected device simply has no
//! collector, and a Measurement block in such a run fails with
//! `NoDeviceConnected`.

use crate::error::ProgramError;

/// One connected measurement device, usable across a whole run.
///
/// `start` is called once before the first collection of a session and
/// `stop` once after the last; `run_one_collection` performs a single pass
/// and blocks until the device has delivered its readings. Implementations
/// that search for hardware and come up empty return `DeviceNotFound` from
/// `start`.
pub trait MeasurementCollector: Send + Sync {
    fn start(&self) -> Result<(), ProgramError>;

    fn run_one_collection(&self) -> Result<(), ProgramError>;

    fn stop(&self) -> Result<(), ProgramError>;
}

/// Collector that only counts, for wiring tests.
#[derive(Default)]
pub struct CountingCollector {
    collections: std::sync::atomic::AtomicUsize,
}

impl CountingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collections(&self) -> usize {
        self.collections.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl MeasurementCollector for CountingCollector {
    fn start(&self) -> Result<(), ProgramError> {
        Ok(())
    }

    fn run_one_collection(&self) -> Result<(), ProgramError> {
        self.collections
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), ProgramError> {
        Ok(())
    }
}
