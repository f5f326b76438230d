//! Configuration structures consumed by the shipper lifecycle.
//!
//! [`ShipperBuilder`](crate::ShipperBuilder) constructs these values before
//! passing them to [`FemtoShipper`](crate::FemtoShipper). A config can also be
//! assembled by hand; [`ShipperConfig::validate`] runs again at construction
//! so a hand-built value is held to the same rules.

use std::time::Duration;

use crate::error::ConfigError;
use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

/// Default number of buffered entries that triggers an immediate flush.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Default time an under-sized batch waits before it is flushed anyway.
pub const DEFAULT_TIME_THRESHOLD: Duration = Duration::from_millis(300_000);
/// Default time `ShutdownPolicy::Drain` waits for outstanding deliveries.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Basic-auth credentials presented to the destination.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Determines which entry is discarded when a bounded buffer is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest buffered entry to make room for the new one.
    #[default]
    DropOldest,
    /// Discard the incoming entry, preserving the buffered ones.
    DropNewest,
}

/// Optional cap on the number of entries held in the pending buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferLimit {
    pub max_entries: usize,
    pub policy: OverflowPolicy,
}

/// Behaviour of [`FemtoShipper::close`](crate::FemtoShipper::close).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShutdownPolicy {
    /// Start one flush if entries remain and nothing is in flight, then
    /// return without waiting for the delivery to finish.
    #[default]
    BestEffort,
    /// Wait for the in-flight delivery, then keep flushing until the buffer
    /// is empty or `timeout` has elapsed.
    Drain { timeout: Duration },
}

/// Configuration object describing how to construct a
/// [`FemtoShipper`](crate::FemtoShipper).
#[derive(Clone, Debug)]
pub struct ShipperConfig {
    /// Base address of the ingestion service.
    pub url: String,
    /// Organisation identifier embedded in the endpoint path.
    pub organization: String,
    /// Stream identifier embedded in the endpoint path.
    pub stream: String,
    /// Basic-auth credentials.
    pub credentials: Credentials,
    /// Buffer length that triggers an immediate flush.
    pub batch_size: usize,
    /// Maximum wait before an under-sized batch is flushed.
    pub time_threshold: Duration,
    /// Suppress the success diagnostics channel.
    pub silent_success: bool,
    /// Suppress the error diagnostics channel.
    pub silent_error: bool,
    /// Optional capacity policy for the pending buffer. `None` is unbounded.
    pub buffer_limit: Option<BufferLimit>,
    /// What `close` does with buffered entries.
    pub shutdown: ShutdownPolicy,
    /// Connect timeout handed to the HTTP transport. `None` leaves it unset.
    pub connect_timeout: Option<Duration>,
    /// Overall request timeout handed to the HTTP transport.
    pub request_timeout: Option<Duration>,
    /// Interval between rate-limited overflow warnings.
    pub warn_interval: Duration,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            organization: String::new(),
            stream: String::new(),
            credentials: Credentials::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            time_threshold: DEFAULT_TIME_THRESHOLD,
            silent_success: false,
            silent_error: false,
            buffer_limit: None,
            shutdown: ShutdownPolicy::default(),
            connect_timeout: None,
            request_timeout: None,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl ShipperConfig {
    /// Check required fields and numeric ranges.
    ///
    /// Blank destination fields are reported together so the caller sees
    /// every missing option at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = [
            ("url", &self.url),
            ("organization", &self.organization),
            ("stream", &self.stream),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingOptions(missing));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "batch_size must be greater than zero".into(),
            ));
        }
        if self.time_threshold.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "time_threshold must be greater than zero".into(),
            ));
        }
        if let Some(limit) = self.buffer_limit
            && limit.max_entries == 0
        {
            return Err(ConfigError::InvalidConfig(
                "max_buffered must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn complete() -> ShipperConfig {
        ShipperConfig {
            url: "http://localhost:5080".into(),
            organization: "default".into(),
            stream: "app".into(),
            ..Default::default()
        }
    }

    #[rstest]
    fn defaults_match_documented_values() {
        let config = ShipperConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.time_threshold, Duration::from_millis(300_000));
        assert!(!config.silent_success);
        assert!(!config.silent_error);
        assert!(config.buffer_limit.is_none());
        assert_eq!(config.shutdown, ShutdownPolicy::BestEffort);
    }

    #[rstest]
    fn complete_config_validates() {
        assert!(complete().validate().is_ok());
    }

    #[rstest]
    #[case::url(|c: &mut ShipperConfig| c.url.clear(), vec!["url"])]
    #[case::organization(|c: &mut ShipperConfig| c.organization = "  ".into(), vec!["organization"])]
    #[case::stream(|c: &mut ShipperConfig| c.stream.clear(), vec!["stream"])]
    #[case::all(|c: &mut ShipperConfig| *c = ShipperConfig::default(), vec!["url", "organization", "stream"])]
    fn blank_required_fields_are_reported(
        #[case] mutate: fn(&mut ShipperConfig),
        #[case] expected: Vec<&'static str>,
    ) {
        let mut config = complete();
        mutate(&mut config);
        match config.validate() {
            Err(ConfigError::MissingOptions(fields)) => assert_eq!(fields, expected),
            other => panic!("expected MissingOptions, got {other:?}"),
        }
    }

    #[rstest]
    fn zero_batch_size_is_rejected() {
        let config = ShipperConfig {
            batch_size: 0,
            ..complete()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(msg)) if msg.contains("batch_size")
        ));
    }

    #[rstest]
    fn zero_buffer_limit_is_rejected() {
        let config = ShipperConfig {
            buffer_limit: Some(BufferLimit {
                max_entries: 0,
                policy: OverflowPolicy::DropNewest,
            }),
            ..complete()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(msg)) if msg.contains("max_buffered")
        ));
    }

    #[rstest]
    fn debug_output_redacts_password() {
        let creds = Credentials::new("alice", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
