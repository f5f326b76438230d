//! Error types surfaced by the shipper.
//!
//! Configuration problems are reported synchronously when a
//! [`FemtoShipper`](crate::FemtoShipper) is constructed. Delivery problems are
//! never returned to producers; they only reach the error diagnostics channel.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while constructing a shipper.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more of the required destination options were absent or blank.
    #[error("missing required options: {}", .0.join(", "))]
    MissingOptions(Vec<&'static str>),
    /// A supplied option was out of range or otherwise unusable.
    #[error("invalid shipper configuration: {0}")]
    InvalidConfig(String),
    /// The destination address could not be parsed.
    #[error("invalid destination url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The TLS connector for HTTPS destinations could not be created.
    #[error("failed to initialise TLS: {0}")]
    Tls(#[from] native_tls::Error),
    /// A configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A configuration file could not be parsed.
    #[error("{} is invalid: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    /// A configuration file value had the wrong shape.
    #[error("invalid value for `{key}`: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Errors returned to producers calling [`FemtoShipper::accept`](crate::FemtoShipper::accept).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShipperError {
    /// The shipper has been closed and no longer accepts entries.
    #[error("shipper is closed")]
    Closed,
}

/// Failure reported by a [`Transport`](crate::Transport) when no HTTP response
/// could be obtained.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of a batch that could not be delivered.
///
/// The batch is consumed either way: it is neither retried nor returned to
/// the pending buffer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The destination answered with a status outside the 2xx class.
    #[error("destination responded {status} {status_text}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_options_lists_each_field() {
        let err = ConfigError::MissingOptions(vec!["url", "stream"]);
        assert_eq!(err.to_string(), "missing required options: url, stream");
    }

    #[test]
    fn http_failure_includes_status_and_text() {
        let failure = DeliveryFailure::Http {
            status: 500,
            status_text: "Internal Server Error".into(),
            body: String::new(),
        };
        assert_eq!(
            failure.to_string(),
            "destination responded 500 Internal Server Error"
        );
    }

    #[test]
    fn transport_failure_wraps_message() {
        let failure = DeliveryFailure::from(TransportError::new("connection refused"));
        assert_eq!(failure.to_string(), "transport error: connection refused");
    }
}
