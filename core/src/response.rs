//! The response envelope returned by `HttpConnection`.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::http::Headers;

/// Decoded body together with the response metadata.
///
/// Only produced when the transport delivered a response; transport failures
/// surface as `Error::Transport` instead.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub headers: Headers,
    pub body_as_object: T,
    pub raw_body: Vec<u8>,
}

impl<T> ApiResponse<T> {
    pub fn into_body(self) -> T {
        self.body_as_object
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Replace the decoded body, keeping the metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            status: self.status,
            headers: self.headers,
            body_as_object: f(self.body_as_object),
            raw_body: self.raw_body,
        }
    }
}

/// Marker for responses whose body is irrelevant. Decodes from any value,
/// including an empty body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoContent;

impl<'de> Deserialize<'de> for NoContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(NoContent)
    }
}
