//! Client configuration.
//!
//! Built once and shared read-only with the connection for the lifetime of
//! a client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::http::Headers;
use crate::serializer::HAL_JSON;

pub const ENV_ROOT_ENDPOINT: &str = "HALKIT_ROOT_ENDPOINT";
pub const ENV_MEDIA_TYPE: &str = "HALKIT_MEDIA_TYPE";
pub const ENV_TIMEOUT_SECS: &str = "HALKIT_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalKitConfiguration {
    /// Entry point of the API. Required; checked when the client is built.
    pub root_endpoint: Option<Url>,
    /// Media type used for `Accept` and request `Content-Type`.
    pub media_type: String,
    /// Overall request timeout handed to the transport.
    #[serde(with = "opt_secs")]
    pub timeout: Option<Duration>,
    /// Headers added to every request unless the caller already set them.
    pub default_headers: Headers,
}

impl Default for HalKitConfiguration {
    fn default() -> Self {
        Self {
            root_endpoint: None,
            media_type: HAL_JSON.to_string(),
            timeout: None,
            default_headers: Headers::new(),
        }
    }
}

impl HalKitConfiguration {
    pub fn new(root_endpoint: Url) -> Self {
        Self {
            root_endpoint: Some(root_endpoint),
            ..Self::default()
        }
    }

    /// Parse `root_endpoint` and build a configuration around it.
    pub fn with_root(root_endpoint: &str) -> Result<Self> {
        let url = Url::parse(root_endpoint)
            .map_err(|e| Error::Configuration(format!("root endpoint '{root_endpoint}': {e}")))?;
        Ok(Self::new(url))
    }

    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.append(name, value);
        self
    }

    /// Read `HALKIT_ROOT_ENDPOINT`, `HALKIT_MEDIA_TYPE` and
    /// `HALKIT_TIMEOUT_SECS`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(ENV_ROOT_ENDPOINT) {
            Some(root) => Self::with_root(&root)?,
            None => Self::default(),
        };
        if let Some(media_type) = lookup(ENV_MEDIA_TYPE) {
            config.media_type = media_type;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::Configuration(format!("{ENV_TIMEOUT_SECS}='{secs}' is not a number"))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

mod opt_secs {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(d)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(D::Error::custom))
            .transpose()
    }
}
