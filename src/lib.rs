//! Batching log shipper for HTTP ingestion endpoints.
//!
//! [`FemtoShipper`] accepts pre-serialised log fragments, buffers them in
//! arrival order and posts them in batches to
//! `{url}/api/{organization}/{stream}/_multi` using basic authentication.
//! A flush happens as soon as `batch_size` entries are waiting or when
//! `time_threshold` passes without the batch filling; only one delivery is
//! ever in flight.
//!
//! ```no_run
//! use femtoship::ShipperBuilder;
//!
//! let shipper = ShipperBuilder::new()
//!     .with_url("https://ingest.example.com")
//!     .with_organization("default")
//!     .with_stream("app")
//!     .with_basic_auth("root@example.com", "secret")
//!     .build()?;
//! shipper.accept("{\"level\":\"info\",\"msg\":\"started\"}\n")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod endpoint;
pub mod error;
mod file_config;
pub mod rate_limited_warner;
pub mod shipper;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use builder::ShipperBuilder;
pub use config::{BufferLimit, Credentials, OverflowPolicy, ShipperConfig, ShutdownPolicy};
pub use diagnostics::{DiagnosticSink, LogDiagnostics};
pub use error::{ConfigError, DeliveryFailure, ShipperError, TransportError};
pub use shipper::{FemtoShipper, StatsSnapshot};
pub use transport::{DeliveryRequest, Transport, TransportResponse, UreqTransport};
