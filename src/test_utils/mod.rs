//! Test helpers shared by unit and integration tests.
//!
//! Compiled for unit tests and for integration tests through the `test-util`
//! feature. Provides a transport that records requests instead of sending
//! them and a diagnostics sink that keeps every outcome for assertions.

pub mod collecting_sink;
pub mod recording_transport;

pub use collecting_sink::{CollectingSink, DiagnosticEvent};
pub use recording_transport::{RecordedRequest, RecordingTransport};
