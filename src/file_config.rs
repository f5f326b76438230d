//! INI configuration loading.
//!
//! Lets deployments describe a shipper in a config file section instead of
//! code. Parsing goes through the `rust-ini` crate:
//!
//! ```ini
//! [shipper]
//! url = https://ingest.example.com
//! organization = default
//! stream = app
//! username = root@example.com
//! password = secret
//! batch_size = 100
//! time_threshold_ms = 300000
//! ```
//!
//! Keys that are not recognised are ignored so the same file can carry
//! settings for other components.

use std::{fs, path::Path, str::FromStr, time::Duration};

use ini::{Ini, Properties};

use crate::{
    builder::ShipperBuilder,
    config::{DEFAULT_DRAIN_TIMEOUT, OverflowPolicy, ShutdownPolicy},
    error::ConfigError,
};

impl ShipperBuilder {
    /// Read `section` of the INI file at `path` into a builder.
    ///
    /// The returned builder can be further customised before `build` is
    /// called; required options missing from the file are only reported at
    /// build time.
    pub fn from_ini_file(path: impl AsRef<Path>, section: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ini = Ini::load_from_str(&text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let props = ini.section(Some(section)).ok_or_else(|| ConfigError::Parse {
            path: path.to_path_buf(),
            message: format!("missing section [{section}]"),
        })?;
        Self::from_properties(props)
    }

    fn from_properties(props: &Properties) -> Result<Self, ConfigError> {
        let mut builder = ShipperBuilder::new();
        if let Some(url) = props.get("url") {
            builder = builder.with_url(url);
        }
        if let Some(organization) = props.get("organization") {
            builder = builder.with_organization(organization);
        }
        if let Some(stream) = props.get("stream") {
            builder = builder.with_stream(stream);
        }
        if props.contains_key("username") || props.contains_key("password") {
            builder = builder.with_basic_auth(
                props.get("username").unwrap_or_default(),
                props.get("password").unwrap_or_default(),
            );
        }
        if let Some(size) = parse_value::<usize>(props, "batch_size")? {
            builder = builder.with_batch_size(size);
        }
        if let Some(ms) = parse_value::<u64>(props, "time_threshold_ms")? {
            builder = builder.with_time_threshold_ms(ms);
        }
        if let Some(flag) = parse_bool(props, "silent_success")? {
            builder = builder.with_silent_success(flag);
        }
        if let Some(flag) = parse_bool(props, "silent_error")? {
            builder = builder.with_silent_error(flag);
        }
        if let Some(ms) = parse_value::<u64>(props, "connect_timeout_ms")? {
            builder = builder.with_connect_timeout_ms(ms);
        }
        if let Some(ms) = parse_value::<u64>(props, "request_timeout_ms")? {
            builder = builder.with_request_timeout_ms(ms);
        }
        if let Some(max) = parse_value::<usize>(props, "max_buffered")? {
            let policy = parse_overflow(props)?.unwrap_or_default();
            builder = builder.with_buffer_limit(max, policy);
        }
        if let Some(policy) = parse_shutdown(props)? {
            builder = builder.with_shutdown_policy(policy);
        }
        Ok(builder)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

fn parse_value<T: FromStr>(props: &Properties, key: &str) -> Result<Option<T>, ConfigError> {
    props
        .get(key)
        .map(|raw| raw.trim().parse::<T>().map_err(|_| invalid(key, raw)))
        .transpose()
}

fn parse_bool(props: &Properties, key: &str) -> Result<Option<bool>, ConfigError> {
    props
        .get(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(invalid(key, raw)),
        })
        .transpose()
}

fn parse_overflow(props: &Properties) -> Result<Option<OverflowPolicy>, ConfigError> {
    props
        .get("overflow_policy")
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "drop_oldest" => Ok(OverflowPolicy::DropOldest),
            "drop_newest" => Ok(OverflowPolicy::DropNewest),
            _ => Err(invalid("overflow_policy", raw)),
        })
        .transpose()
}

fn parse_shutdown(props: &Properties) -> Result<Option<ShutdownPolicy>, ConfigError> {
    let timeout = parse_value::<u64>(props, "drain_timeout_ms")?
        .map_or(DEFAULT_DRAIN_TIMEOUT, Duration::from_millis);
    props
        .get("shutdown")
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "best_effort" => Ok(ShutdownPolicy::BestEffort),
            "drain" => Ok(ShutdownPolicy::Drain { timeout }),
            _ => Err(invalid("shutdown", raw)),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferLimit;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_ini(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp ini file");
        file.write_all(contents.as_bytes()).expect("write ini contents");
        file
    }

    #[rstest]
    fn reads_complete_section() {
        let file = write_ini(
            "[other]\nurl = http://ignored\n\n\
             [shipper]\n\
             url = https://ingest.example.com/\n\
             organization = default\n\
             stream = app\n\
             username = root@example.com\n\
             password = secret\n\
             batch_size = 25\n\
             time_threshold_ms = 1500\n\
             silent_success = yes\n\
             max_buffered = 1000\n\
             overflow_policy = drop_newest\n\
             shutdown = drain\n\
             drain_timeout_ms = 750\n\
             unrelated = kept out\n",
        );
        let config = ShipperBuilder::from_ini_file(file.path(), "shipper")
            .expect("load")
            .build_config()
            .expect("valid config");
        assert_eq!(config.url, "https://ingest.example.com/");
        assert_eq!(config.organization, "default");
        assert_eq!(config.stream, "app");
        assert_eq!(config.credentials.password, "secret");
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.time_threshold, Duration::from_millis(1500));
        assert!(config.silent_success);
        assert!(!config.silent_error);
        assert_eq!(
            config.buffer_limit,
            Some(BufferLimit {
                max_entries: 1000,
                policy: OverflowPolicy::DropNewest
            })
        );
        assert_eq!(
            config.shutdown,
            ShutdownPolicy::Drain {
                timeout: Duration::from_millis(750)
            }
        );
    }

    #[rstest]
    fn missing_required_keys_surface_at_build() {
        let file = write_ini("[shipper]\nurl = http://localhost:5080\n");
        let err = ShipperBuilder::from_ini_file(file.path(), "shipper")
            .expect("load")
            .build_config()
            .expect_err("missing options");
        assert!(matches!(err, ConfigError::MissingOptions(ref f) if f == &["organization", "stream"]));
    }

    #[rstest]
    #[case("batch_size = lots", "batch_size")]
    #[case("silent_error = maybe", "silent_error")]
    #[case("shutdown = eventually", "shutdown")]
    #[case("max_buffered = 5\noverflow_policy = block", "overflow_policy")]
    fn malformed_values_are_rejected(#[case] line: &str, #[case] expected_key: &str) {
        let file = write_ini(&format!("[shipper]\n{line}\n"));
        match ShipperBuilder::from_ini_file(file.path(), "shipper") {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[rstest]
    fn missing_section_is_a_parse_error() {
        let file = write_ini("[other]\nurl = http://localhost\n");
        assert!(matches!(
            ShipperBuilder::from_ini_file(file.path(), "shipper"),
            Err(ConfigError::Parse { message, .. }) if message.contains("[shipper]")
        ));
    }

    #[rstest]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.ini");
        assert!(matches!(
            ShipperBuilder::from_ini_file(&path, "shipper"),
            Err(ConfigError::Io { .. })
        ));
    }
}
