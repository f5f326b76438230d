//! Success and error channels for delivery outcomes.
//!
//! Every flush ends in exactly one call to a [`DiagnosticSink`], unless the
//! matching `silent_*` option suppresses it. The default sink writes through
//! the `log` facade so outcomes land wherever the host application routes its
//! own logging.

use log::{error, info};
use serde_json::Value;

use crate::error::DeliveryFailure;

/// Receiver for per-batch delivery outcomes.
pub trait DiagnosticSink: Send + Sync {
    /// A batch of `entries` fragments was accepted by the destination.
    fn delivered(&self, endpoint: &str, entries: usize, ack: &Value);

    /// A batch of `entries` fragments was dropped after a failed delivery.
    fn failed(&self, endpoint: &str, entries: usize, failure: &DeliveryFailure);
}

/// [`DiagnosticSink`] writing through the `log` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn delivered(&self, endpoint: &str, entries: usize, ack: &Value) {
        info!("FemtoShipper delivered {entries} entries to {endpoint}: {ack}");
    }

    fn failed(&self, endpoint: &str, entries: usize, failure: &DeliveryFailure) {
        error!("FemtoShipper failed to deliver {entries} entries to {endpoint}: {failure}");
    }
}

/// Parse the acknowledgement body, keeping non-JSON bodies as a string.
pub(crate) fn parse_ack(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
}
