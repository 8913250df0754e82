//! Body serializers selected by media type.
//!
//! Serializers exchange `serde_json::Value` with the connection, which keeps
//! the trait object-safe; conversion to and from caller types happens in
//! `HttpConnection` through serde.

use serde_json::Value;

use crate::error::BoxError;

pub const HAL_JSON: &str = "application/hal+json";
pub const JSON: &str = "application/json";

/// Encodes and decodes bodies for one family of media types.
pub trait Serializer: Send + Sync {
    /// Media type written as `Content-Type` when this serializer encodes.
    fn media_type(&self) -> &str;

    /// Whether this serializer understands `content_type` (parameters such as
    /// `charset` are already stripped and the value lowercased).
    fn can_handle(&self, content_type: &str) -> bool;

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, BoxError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, BoxError>;
}

/// JSON serializer for HAL, plain JSON and any `+json` media type.
#[derive(Debug, Clone)]
pub struct JsonSerializer {
    media_type: String,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::with_media_type(HAL_JSON)
    }

    pub fn with_media_type(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
        }
    }
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer for JsonSerializer {
    fn media_type(&self) -> &str {
        &self.media_type
    }

    fn can_handle(&self, content_type: &str) -> bool {
        content_type == JSON || content_type.ends_with("+json")
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, BoxError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, BoxError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Strip parameters from a `Content-Type` value and lowercase it.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
