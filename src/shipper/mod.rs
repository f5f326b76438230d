//! Batching log shipper.
//!
//! This module defines [`FemtoShipper`], which buffers pre-serialised log
//! fragments and posts them in batches to an ingestion endpoint. A worker
//! thread owns the buffer, the deadline timer and the in-flight flag; a
//! courier thread performs the single outstanding delivery.
//!
//! # Flush triggers
//!
//! After every accepted entry and every finished delivery the worker cancels
//! the pending deadline and then either:
//!
//! - flushes immediately, when at least `batch_size` entries are buffered and
//!   no delivery is in flight, or
//! - arms a new deadline `time_threshold` from now.
//!
//! # Delivery semantics
//!
//! Each batch is delivered at most once. HTTP errors and transport errors are
//! reported through the [`DiagnosticSink`](crate::DiagnosticSink) and the
//! batch is discarded.

mod buffer;
mod handler;
mod state;
mod stats;
mod worker;


pub use handler::FemtoShipper;
pub use stats::StatsSnapshot;
