//! Outbound HTTP delivery.
//!
//! The shipper never talks to ureq directly; it hands a [`DeliveryRequest`] to
//! a [`Transport`]. [`UreqTransport`] is the production implementation and
//! tests substitute a recording transport.

use std::{io::Read, sync::Arc};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use log::debug;
use ureq::{Agent, AgentBuilder};

use crate::{
    config::{Credentials, ShipperConfig},
    error::{ConfigError, TransportError},
};

/// Content type declared for every batch.
pub const CONTENT_TYPE: &str = "application/json";

/// Render `credentials` as an `Authorization` header value.
pub fn basic_authorization(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.username, credentials.password);
    format!("Basic {}", BASE64_STANDARD.encode(raw.as_bytes()))
}

/// A single POST of one batch.
#[derive(Clone, Copy, Debug)]
pub struct DeliveryRequest<'a> {
    pub url: &'a str,
    /// Complete `Authorization` header value, e.g. `Basic dXNlcjpwYXNz`.
    pub authorization: &'a str,
    pub content_type: &'a str,
    pub body: &'a str,
}

/// Response returned by the destination, whatever its status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl TransportResponse {
    /// Whether the status belongs to the 2xx class.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Capability to issue one outbound delivery and wait for its outcome.
///
/// Implementations should return `Ok` for any HTTP response, including error
/// statuses, and reserve `Err` for failures that produced no response.
pub trait Transport: Send + Sync {
    fn deliver(&self, request: &DeliveryRequest<'_>) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a pooled `ureq::Agent`.
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Build an agent using the timeouts from `config`.
    ///
    /// Timeouts left as `None` are not applied, so a delivery lasts as long as
    /// the underlying connection allows.
    pub fn from_config(config: &ShipperConfig) -> Result<Self, ConfigError> {
        let tls = native_tls::TlsConnector::new()?;
        let mut builder = AgentBuilder::new().tls_connector(Arc::new(tls));
        if let Some(timeout) = config.connect_timeout {
            builder = builder.timeout_connect(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            agent: builder.build(),
        })
    }

    /// Wrap an existing agent.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }

    /// Capture status and body. The body is read as bytes and decoded
    /// lossily; a failed body read keeps whatever arrived, so the status alone
    /// decides the outcome.
    fn read_response(response: ureq::Response) -> TransportResponse {
        let status = response.status();
        let status_text = response.status_text().to_owned();
        let mut bytes = Vec::new();
        if let Err(err) = response.into_reader().read_to_end(&mut bytes) {
            debug!("FemtoShipper could not read full response body (status {status}): {err}");
        }
        TransportResponse {
            status,
            status_text,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

impl Transport for UreqTransport {
    fn deliver(&self, request: &DeliveryRequest<'_>) -> Result<TransportResponse, TransportError> {
        let result = self
            .agent
            .post(request.url)
            .set("Authorization", request.authorization)
            .set("Content-Type", request.content_type)
            .send_string(request.body);
        match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => {
                Ok(Self::read_response(response))
            }
            Err(ureq::Error::Transport(err)) => Err(TransportError::new(err.to_string())),
        }
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(200, true)]
    #[case(201, true)]
    #[case(299, true)]
    #[case(199, false)]
    #[case(301, false)]
    #[case(404, false)]
    #[case(500, false)]
    fn success_class(#[case] status: u16, #[case] expected: bool) {
        let response = TransportResponse {
            status,
            status_text: String::new(),
            body: String::new(),
        };
        assert_eq!(response.is_success(), expected);
    }

    #[rstest]
    #[case("user", "pass", "Basic dXNlcjpwYXNz")]
    #[case("a", "", "Basic YTo=")]
    #[case("", "", "Basic Og==")]
    fn encodes_basic_credentials(#[case] user: &str, #[case] pass: &str, #[case] expected: &str) {
        assert_eq!(basic_authorization(&Credentials::new(user, pass)), expected);
    }

    #[rstest]
    fn unreachable_destination_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind");
            listener.local_addr().expect("local addr").port()
        };
        let agent = AgentBuilder::new()
            .timeout_connect(Duration::from_millis(500))
            .timeout(Duration::from_secs(1))
            .build();
        let transport = UreqTransport::with_agent(agent);
        let url = format!("http://127.0.0.1:{port}/api/org/logs/_multi");
        let request = DeliveryRequest {
            url: &url,
            authorization: "Basic Og==",
            content_type: CONTENT_TYPE,
            body: "{}",
        };
        assert!(transport.deliver(&request).is_err());
    }
}
