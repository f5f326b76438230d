//! Worker threads driving buffering and delivery.
//!
//! The worker thread is the only owner of [`ShipperState`]. Producers, the
//! deadline timer and delivery completions all reach it as `select!` arms,
//! so every state transition happens on one thread. Deliveries run on a
//! separate courier thread fed through a single-slot channel; the worker
//! only hands over a batch when the in-flight flag was clear.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::{Receiver, Sender, after, bounded, never, select, unbounded};
use log::{debug, error, warn};
use serde_json::Value;

use crate::{
    config::{ShipperConfig, ShutdownPolicy},
    diagnostics::{DiagnosticSink, parse_ack},
    error::{DeliveryFailure, TransportError},
    rate_limited_warner::RateLimitedWarner,
    transport::{CONTENT_TYPE, DeliveryRequest, Transport},
};

use super::{
    buffer::{Batch, PushOutcome},
    state::ShipperState,
    stats::ShipperStats,
};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub(crate) enum ShipperCommand {
    Entry(String),
    Flush(Sender<bool>),
    Shutdown(Sender<()>),
}

/// Completion notice posted by the courier after each delivery.
#[derive(Debug)]
pub(crate) struct DeliveryReport {
    pub entries: usize,
    pub delivered: bool,
}

/// Performs deliveries and reports their outcome.
pub(crate) struct Courier {
    pub transport: Arc<dyn Transport>,
    pub sink: Arc<dyn DiagnosticSink>,
    pub endpoint: String,
    pub authorization: String,
    pub silent_success: bool,
    pub silent_error: bool,
    pub stats: Arc<ShipperStats>,
}

impl Courier {
    fn send(&self, batch: &Batch) -> Result<Value, DeliveryFailure> {
        let request = DeliveryRequest {
            url: &self.endpoint,
            authorization: &self.authorization,
            content_type: CONTENT_TYPE,
            body: &batch.payload,
        };
        // A panicking transport is reported as a transport failure.
        let response = panic::catch_unwind(AssertUnwindSafe(|| self.transport.deliver(&request)))
            .unwrap_or_else(|payload| {
                Err(TransportError::new(format!(
                    "transport panicked: {}",
                    panic_message(&*payload)
                )))
            })?;
        if response.is_success() {
            Ok(parse_ack(&response.body))
        } else {
            Err(DeliveryFailure::Http {
                status: response.status,
                status_text: response.status_text,
                body: response.body,
            })
        }
    }

    fn deliver(&self, batch: &Batch) -> DeliveryReport {
        let delivered = match self.send(batch) {
            Ok(ack) => {
                self.stats.record_delivered();
                if !self.silent_success {
                    self.notify(|sink| sink.delivered(&self.endpoint, batch.entries, &ack));
                }
                true
            }
            Err(failure) => {
                self.stats.record_failed();
                if !self.silent_error {
                    self.notify(|sink| sink.failed(&self.endpoint, batch.entries, &failure));
                }
                false
            }
        };
        DeliveryReport {
            entries: batch.entries,
            delivered,
        }
    }

    fn notify(&self, call: impl FnOnce(&dyn DiagnosticSink)) {
        let sink = self.sink.as_ref();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| call(sink))) {
            error!(
                "FemtoShipper diagnostics sink panicked: {}",
                panic_message(&*payload)
            );
        }
    }

    fn run(self, batches: Receiver<Batch>, reports: Sender<DeliveryReport>) {
        for batch in batches {
            let report = self.deliver(&batch);
            // The worker may already be gone after a best-effort shutdown.
            let _ = reports.send(report);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Handle to the worker thread and its command channel.
pub(crate) struct WorkerParts {
    pub(crate) tx: Sender<ShipperCommand>,
    pub(crate) handle: JoinHandle<()>,
}

/// Spawn the worker and courier threads.
///
/// The courier is detached: after a best-effort shutdown it finishes the last
/// delivery on its own and exits once the worker has dropped its sender.
pub(crate) fn spawn_worker(
    config: &ShipperConfig,
    courier: Courier,
    stats: Arc<ShipperStats>,
) -> WorkerParts {
    let (tx, rx) = unbounded();
    let (batch_tx, batch_rx) = bounded(1);
    let (report_tx, report_rx) = bounded(1);
    thread::spawn(move || courier.run(batch_rx, report_tx));

    let worker = Worker {
        state: ShipperState::new(config),
        batches: batch_tx,
        shutdown_policy: config.shutdown,
        warner: RateLimitedWarner::new(config.warn_interval),
        stats,
    };
    let handle = thread::spawn(move || worker.run(rx, report_rx));
    WorkerParts { tx, handle }
}

struct Worker {
    state: ShipperState,
    batches: Sender<Batch>,
    shutdown_policy: ShutdownPolicy,
    warner: RateLimitedWarner,
    stats: Arc<ShipperStats>,
}

impl Worker {
    fn run(mut self, rx: Receiver<ShipperCommand>, reports: Receiver<DeliveryReport>) {
        loop {
            let timer = match self.state.deadline() {
                Some(deadline) => after(deadline.saturating_duration_since(Instant::now())),
                None => never(),
            };
            select! {
                recv(rx) -> cmd => match cmd {
                    Ok(ShipperCommand::Entry(entry)) => self.handle_entry(entry),
                    Ok(ShipperCommand::Flush(ack)) => {
                        let started = self.handle_flush();
                        let _ = ack.send(started);
                    }
                    Ok(ShipperCommand::Shutdown(ack)) => {
                        self.shutdown(&rx, &reports);
                        let _ = ack.send(());
                        break;
                    }
                    Err(_) => {
                        self.shutdown(&rx, &reports);
                        break;
                    }
                },
                recv(reports) -> report => match report {
                    Ok(report) => self.handle_report(report),
                    Err(_) => {
                        error!("FemtoShipper courier thread exited; stopping worker");
                        self.shutdown(&rx, &reports);
                        break;
                    }
                },
                recv(timer) -> _ => {
                    let batch = self.state.on_deadline();
                    self.dispatch(batch);
                }
            }
        }
    }

    fn handle_entry(&mut self, entry: String) {
        self.stats.record_accepted();
        let (outcome, batch) = self.state.accept(entry, Instant::now());
        self.note_push(outcome);
        self.dispatch(batch);
    }

    fn handle_flush(&mut self) -> bool {
        let batch = self.state.flush();
        self.dispatch(batch)
    }

    fn handle_report(&mut self, report: DeliveryReport) {
        debug!(
            "FemtoShipper delivery of {} entries finished (delivered: {})",
            report.entries, report.delivered
        );
        let batch = self.state.on_delivery_complete(Instant::now());
        self.dispatch(batch);
    }

    fn note_push(&self, outcome: PushOutcome) {
        if outcome == PushOutcome::Stored {
            return;
        }
        self.stats.record_dropped();
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!("FemtoShipper buffer full; dropped {count} entries");
        });
    }

    /// Hand `batch` to the courier. Returns whether a delivery started.
    fn dispatch(&mut self, batch: Option<Batch>) -> bool {
        let Some(batch) = batch else {
            return false;
        };
        debug!("FemtoShipper flushing {} entries", batch.entries);
        match self.batches.try_send(batch) {
            Ok(()) => true,
            Err(err) => {
                let lost = err.into_inner();
                warn!(
                    "FemtoShipper courier unavailable; dropped {} entries",
                    lost.entries
                );
                self.stats.record_failed();
                self.state.release_in_flight();
                false
            }
        }
    }

    /// Move entries still queued on the command channel into the buffer.
    fn drain_commands(&mut self, rx: &Receiver<ShipperCommand>) {
        while let Ok(cmd) = rx.try_recv() {
            match cmd {
                ShipperCommand::Entry(entry) => {
                    self.stats.record_accepted();
                    let outcome = self.state.enqueue(entry);
                    self.note_push(outcome);
                }
                ShipperCommand::Flush(ack) => {
                    let _ = ack.send(false);
                }
                ShipperCommand::Shutdown(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    }

    fn shutdown(&mut self, rx: &Receiver<ShipperCommand>, reports: &Receiver<DeliveryReport>) {
        self.drain_commands(rx);
        match self.shutdown_policy {
            ShutdownPolicy::BestEffort => {
                let batch = self.state.flush();
                self.dispatch(batch);
            }
            ShutdownPolicy::Drain { timeout } => {
                self.drain_buffer(reports, Instant::now().checked_add(timeout));
            }
        }
        self.warner.flush(|count| {
            warn!("FemtoShipper dropped {count} entries in the last interval");
        });
        let left = self.state.pending();
        if left > 0 {
            warn!("FemtoShipper shut down with {left} undelivered entries");
        }
    }

    fn drain_buffer(&mut self, reports: &Receiver<DeliveryReport>, deadline: Option<Instant>) {
        loop {
            if self.state.is_in_flight() {
                let report = match deadline {
                    Some(deadline) => reports.recv_deadline(deadline).ok(),
                    None => reports.recv().ok(),
                };
                match report {
                    Some(report) => {
                        debug!(
                            "FemtoShipper drained delivery of {} entries",
                            report.entries
                        );
                        self.state.release_in_flight();
                    }
                    None => {
                        warn!("FemtoShipper drain timed out with a delivery in flight");
                        return;
                    }
                }
                continue;
            }
            let batch = self.state.flush();
            if !self.dispatch(batch) {
                return;
            }
        }
    }
}
