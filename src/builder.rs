//! Builder for [`FemtoShipper`](crate::FemtoShipper).
//!
//! Exposes the destination, credentials, batching thresholds, diagnostics
//! suppression, buffer limits and shutdown behaviour. Omitted options fall
//! back to the defaults declared in [`crate::config`].

use std::{sync::Arc, time::Duration};

use crate::{
    config::{BufferLimit, Credentials, OverflowPolicy, ShipperConfig, ShutdownPolicy},
    diagnostics::{DiagnosticSink, LogDiagnostics},
    error::ConfigError,
    shipper::FemtoShipper,
    transport::{Transport, UreqTransport},
};

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(ConfigError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`FemtoShipper`] instances.
#[derive(Clone, Default)]
pub struct ShipperBuilder {
    url: Option<String>,
    organization: Option<String>,
    stream: Option<String>,
    credentials: Option<Credentials>,
    batch_size: Option<usize>,
    time_threshold_ms: Option<u64>,
    silent_success: Option<bool>,
    silent_error: Option<bool>,
    buffer_limit: Option<BufferLimit>,
    shutdown: Option<ShutdownPolicy>,
    connect_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl ShipperBuilder {
    /// Create a new builder with no destination configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base address of the ingestion service (required).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the organisation identifier (required).
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Set the stream identifier (required).
    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = Some(stream.into());
        self
    }

    /// Configure HTTP Basic authentication.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    option_setter!(
        #[doc = "Set the buffer length that triggers an immediate flush."]
        with_batch_size,
        batch_size,
        usize
    );
    option_setter!(
        #[doc = "Set the maximum wait before a partial batch is flushed."]
        with_time_threshold_ms,
        time_threshold_ms,
        u64
    );
    option_setter!(
        #[doc = "Suppress the success diagnostics channel."]
        with_silent_success,
        silent_success,
        bool
    );
    option_setter!(
        #[doc = "Suppress the error diagnostics channel."]
        with_silent_error,
        silent_error,
        bool
    );
    option_setter!(
        #[doc = "Choose what `close` does with buffered entries."]
        with_shutdown_policy,
        shutdown,
        ShutdownPolicy
    );
    option_setter!(
        #[doc = "Set the transport connect timeout in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the overall transport request timeout in milliseconds."]
        with_request_timeout_ms,
        request_timeout_ms,
        u64
    );

    /// Cap the pending buffer at `max_entries`, discarding per `policy`.
    pub fn with_buffer_limit(mut self, max_entries: usize, policy: OverflowPolicy) -> Self {
        self.buffer_limit = Some(BufferLimit {
            max_entries,
            policy,
        });
        self
    }

    /// Route delivery outcomes to `sink` instead of the `log` crate.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(batch_size) = self.batch_size {
            ensure_positive!(batch_size, "batch_size")?;
        }
        if let Some(threshold) = self.time_threshold_ms {
            ensure_positive!(threshold, "time_threshold_ms")?;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        if let Some(timeout) = self.request_timeout_ms {
            ensure_positive!(timeout, "request_timeout_ms")?;
        }
        if let Some(limit) = self.buffer_limit {
            ensure_positive!(limit.max_entries, "max_buffered")?;
        }
        Ok(())
    }

    /// Resolve the options into a validated [`ShipperConfig`].
    pub fn build_config(&self) -> Result<ShipperConfig, ConfigError> {
        self.validate()?;

        let defaults = ShipperConfig::default();
        let config = ShipperConfig {
            url: self.url.clone().unwrap_or_default(),
            organization: self.organization.clone().unwrap_or_default(),
            stream: self.stream.clone().unwrap_or_default(),
            credentials: self.credentials.clone().unwrap_or(defaults.credentials),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            time_threshold: self
                .time_threshold_ms
                .map_or(defaults.time_threshold, Duration::from_millis),
            silent_success: self.silent_success.unwrap_or(defaults.silent_success),
            silent_error: self.silent_error.unwrap_or(defaults.silent_error),
            buffer_limit: self.buffer_limit.or(defaults.buffer_limit),
            shutdown: self.shutdown.unwrap_or(defaults.shutdown),
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
            warn_interval: defaults.warn_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build a shipper delivering through ureq.
    pub fn build(&self) -> Result<FemtoShipper, ConfigError> {
        let config = self.build_config()?;
        let transport = UreqTransport::from_config(&config)?;
        self.spawn(config, Arc::new(transport))
    }

    /// Build a shipper delivering through `transport`.
    pub fn build_with_transport(
        &self,
        transport: Arc<dyn Transport>,
    ) -> Result<FemtoShipper, ConfigError> {
        let config = self.build_config()?;
        self.spawn(config, transport)
    }

    fn spawn(
        &self,
        config: ShipperConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<FemtoShipper, ConfigError> {
        let sink = self
            .diagnostics
            .clone()
            .unwrap_or_else(|| Arc::new(LogDiagnostics));
        FemtoShipper::from_validated(config, transport, sink)
    }
}

impl std::fmt::Debug for ShipperBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipperBuilder")
            .field("url", &self.url)
            .field("organization", &self.organization)
            .field("stream", &self.stream)
            .field("credentials", &self.credentials)
            .field("batch_size", &self.batch_size)
            .field("time_threshold_ms", &self.time_threshold_ms)
            .field("buffer_limit", &self.buffer_limit)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}
