//! Public shipper type exported by the crate.

use std::{sync::Arc, thread::JoinHandle, time::Duration};

use crossbeam_channel::{Sender, bounded};

use crate::{
    config::ShipperConfig,
    diagnostics::{DiagnosticSink, LogDiagnostics},
    endpoint::delivery_endpoint,
    error::{ConfigError, ShipperError},
    transport::{Transport, UreqTransport, basic_authorization},
};

use super::{
    stats::{ShipperStats, StatsSnapshot},
    worker::{Courier, ShipperCommand, WorkerParts, spawn_worker},
};

/// How long `flush` waits for the worker to acknowledge the request.
const FLUSH_ACK_TIMEOUT: Duration = Duration::from_secs(1);

/// Batching shipper forwarding log fragments to an HTTP ingestion endpoint.
///
/// Entries are buffered in arrival order and sent as one concatenated POST
/// once `batch_size` entries are waiting, or once `time_threshold` passes
/// without the batch filling up. At most one delivery is outstanding at any
/// time. Failed batches are reported through the diagnostics sink and
/// dropped; they are never retried.
///
/// Dropping the shipper runs [`close`](Self::close).
pub struct FemtoShipper {
    tx: Option<Sender<ShipperCommand>>,
    handle: Option<JoinHandle<()>>,
    endpoint: String,
    stats: Arc<ShipperStats>,
}

impl FemtoShipper {
    /// Construct a shipper delivering over HTTP and reporting through `log`.
    pub fn with_config(config: ShipperConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = UreqTransport::from_config(&config)?;
        Self::from_validated(config, Arc::new(transport), Arc::new(LogDiagnostics))
    }

    /// Construct a shipper with an explicit transport and diagnostics sink.
    ///
    /// Fails before any thread is spawned if the configuration is invalid.
    pub fn with_parts(
        config: ShipperConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::from_validated(config, transport, sink)
    }

    /// Spawn the worker for a config that already passed `validate`.
    pub(crate) fn from_validated(
        config: ShipperConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, ConfigError> {
        let endpoint = delivery_endpoint(&config.url, &config.organization, &config.stream)?;
        let endpoint = String::from(endpoint);
        let stats = Arc::new(ShipperStats::default());
        let courier = Courier {
            transport,
            sink,
            endpoint: endpoint.clone(),
            authorization: basic_authorization(&config.credentials),
            silent_success: config.silent_success,
            silent_error: config.silent_error,
            stats: Arc::clone(&stats),
        };
        let WorkerParts { tx, handle } = spawn_worker(&config, courier, Arc::clone(&stats));
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            endpoint,
            stats,
        })
    }

    /// Queue one pre-serialised fragment for delivery.
    ///
    /// Never blocks. The fragment must carry its own trailing delimiter; the
    /// shipper concatenates fragments verbatim.
    ///
    /// # Errors
    ///
    /// * [`ShipperError::Closed`] - `close` has already run.
    pub fn accept(&self, entry: impl Into<String>) -> Result<(), ShipperError> {
        let tx = self.tx.as_ref().ok_or(ShipperError::Closed)?;
        tx.send(ShipperCommand::Entry(entry.into()))
            .map_err(|_| ShipperError::Closed)
    }

    /// Ask the worker to flush the next batch now.
    ///
    /// Returns `true` if a delivery was started, `false` if the buffer was
    /// empty, a delivery was already in flight or the shipper is closed. Does
    /// not wait for the delivery to finish.
    pub fn flush(&self) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(ShipperCommand::Flush(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv_timeout(FLUSH_ACK_TIMEOUT).unwrap_or(false)
    }

    /// Stop accepting entries and hand the buffer to the shutdown policy.
    ///
    /// With [`ShutdownPolicy::BestEffort`](crate::ShutdownPolicy::BestEffort)
    /// one final flush is started if entries remain and nothing is in flight;
    /// the call does not wait for it. With
    /// [`ShutdownPolicy::Drain`](crate::ShutdownPolicy::Drain) the call blocks
    /// until the buffer is delivered or the drain timeout expires. Calling
    /// `close` again is a no-op.
    pub fn close(&mut self) {
        self.request_shutdown();
        self.join_worker();
    }

    /// The endpoint every batch is posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    fn request_shutdown(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(ShipperCommand::Shutdown(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.recv();
    }

    fn join_worker(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            log::warn!("FemtoShipper: worker thread panicked");
        }
    }
}

impl Drop for FemtoShipper {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for FemtoShipper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FemtoShipper")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.is_closed())
            .finish()
    }
}
