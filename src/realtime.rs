//! Outbound realtime events and the sink they are pushed through.
//!
//! The transport itself (websocket, socket server, ...) is an external
//! collaborator; the core only knows a [`RealtimeSink`] it can emit
//! self-contained messages into. Emission is safe from multiple axis threads
//! since no cross-message ordering is required beyond "most recent position
//! wins" on the client.

use std::sync::mpsc::Sender;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One message to a connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Current position as display text, sent on every move and on connect.
    Coords { data: String },
    /// Free-text debug line from a DebugPrint block.
    Update { data: String },
    /// Terminal failure of a run; at most one per run.
    ExecutionError {
        error: String,
        block_id: Option<String>,
        error_code: String,
    },
}

pub trait RealtimeSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Sink backed by an mpsc channel; the transport drains the receiver.
pub struct ChannelSink {
    tx: Mutex<Sender<Event>>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Event>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

impl RealtimeSink for ChannelSink {
    fn emit(&self, event: Event) {
        let tx = self.tx.lock().expect("realtime sender poisoned");
        if tx.send(event).is_err() {
            // Receiver is gone; the run keeps going without a client.
            warn!("realtime channel closed, dropping event");
        }
    }
}

/// Sink that only writes to the log. Used when no client transport exists.
#[derive(Default)]
pub struct LogSink;

impl RealtimeSink for LogSink {
    fn emit(&self, event: Event) {
        match event {
            Event::Coords { data } => tracing::debug!(%data, "coords"),
            Event::Update { data } => tracing::info!(%data, "update"),
            Event::ExecutionError {
                error,
                block_id,
                error_code,
            } => tracing::error!(%error, ?block_id, %error_code, "execution_error"),
        }
    }
}

/// Sink that records every event, for assertions in tests and for the CLI
/// to replay after a run.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("recording sink poisoned").clone()
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().expect("recording sink poisoned"))
    }
}

impl RealtimeSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .expect("recording sink poisoned")
            .push(event);
    }
}
