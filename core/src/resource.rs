//! HAL resource shapes returned to callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::link::{Link, Links};

/// The API entry point returned by root discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootResource {
    #[serde(rename = "_links", default)]
    pub links: Links,
    /// Every other property of the root document.
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl RootResource {
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links.get(rel)
    }
}

/// A HAL document whose own state deserializes into `T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<T> {
    #[serde(rename = "_links", default)]
    pub links: Links,
    /// Embedded resources, kept as raw JSON keyed by relation.
    #[serde(rename = "_embedded", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub embedded: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub state: T,
}

impl<T> Resource<T> {
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links.get(rel)
    }

    /// Decode the embedded resource(s) under `rel`.
    pub fn embedded<E: serde::de::DeserializeOwned>(
        &self,
        rel: &str,
    ) -> Option<serde_json::Result<E>> {
        self.embedded
            .get(rel)
            .map(|value| serde_json::from_value(value.clone()))
    }
}
