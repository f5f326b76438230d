//! A diagnostics sink that accumulates outcomes in memory for test assertions.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::Value;

use crate::diagnostics::DiagnosticSink;
use crate::error::DeliveryFailure;

/// One call observed by [`CollectingSink`].
#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticEvent {
    Delivered { entries: usize, ack: Value },
    Failed { entries: usize, failure: DeliveryFailure },
}

/// Sink that stores every outcome it receives for later inspection.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
    arrived: Condvar,
}

impl CollectingSink {
    /// Create a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a snapshot of all events received so far.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    /// Block until at least `count` events arrived or `timeout` elapsed, then
    /// return the snapshot.
    pub fn wait_for_events(&self, count: usize, timeout: Duration) -> Vec<DiagnosticEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock();
        while events.len() < count {
            if self.arrived.wait_until(&mut events, deadline).timed_out() {
                break;
            }
        }
        events.clone()
    }

    fn push(&self, event: DiagnosticEvent) {
        self.events.lock().push(event);
        self.arrived.notify_all();
    }
}

impl DiagnosticSink for CollectingSink {
    fn delivered(&self, _endpoint: &str, entries: usize, ack: &Value) {
        self.push(DiagnosticEvent::Delivered {
            entries,
            ack: ack.clone(),
        });
    }

    fn failed(&self, _endpoint: &str, entries: usize, failure: &DeliveryFailure) {
        self.push(DiagnosticEvent::Failed {
            entries,
            failure: failure.clone(),
        });
    }
}
