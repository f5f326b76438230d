//! Derivation of the ingestion endpoint.
//!
//! The endpoint is `{scheme}://{host}{base-path}/api/{organization}/{stream}/_multi`
//! where trailing slashes on the base path are collapsed so that
//! `http://host/` and `http://host` produce the same target.

use url::Url;

use crate::error::ConfigError;

const API_SEGMENT: &str = "api";
const MULTI_SEGMENT: &str = "_multi";

/// Join the base address with the organisation and stream identifiers.
///
/// Query strings and fragments on the base address are discarded. The
/// identifiers are percent-encoded as individual path segments.
pub fn delivery_endpoint(base: &str, organization: &str, stream: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(base.trim())?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::InvalidConfig(format!(
                "unsupported url scheme `{other}`; expected http or https"
            )));
        }
    }

    let base_path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&base_path);
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| ConfigError::InvalidConfig(format!("{base} cannot be used as a base url")))?
        .pop_if_empty()
        .extend([API_SEGMENT, organization, stream, MULTI_SEGMENT]);
    Ok(url)
}
