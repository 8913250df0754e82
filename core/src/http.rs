//! HTTP transport types.
//!
//! # Design
//! Requests and responses are plain data so they can pass through the
//! handler chain, be cloned for retries and be fabricated in tests without a
//! network. All fields use owned types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Template variable name to value, supplied per call.
pub type Parameters = BTreeMap<String, String>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// The method token sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header name to an ordered list of values.
///
/// Names compare case-insensitively but keep the spelling they were first
/// inserted with. Entries keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(i) => &self.entries[i].1,
            None => &[],
        }
    }

    /// Replace every value stored under `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = vec![value.into()],
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// Add a value after any existing values for `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1.push(value.into()),
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// Store `values` under `name` only if the name is not present yet.
    /// Returns whether anything was inserted.
    pub fn insert_if_absent<I, V>(&mut self, name: &str, values: I) -> bool
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        if self.contains(name) {
            return false;
        }
        self.entries
            .push((name.to_string(), values.into_iter().map(Into::into).collect()));
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, values)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl From<BTreeMap<String, Vec<String>>> for Headers {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Headers {
            entries: map.into_iter().collect(),
        }
    }
}

impl From<Headers> for BTreeMap<String, Vec<String>> {
    fn from(headers: Headers) -> Self {
        headers.entries.into_iter().collect()
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_uses_literal_token() {
        assert_eq!(HttpMethod::Patch.as_str(), "PATCH");
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "application/hal+json");
        assert!(headers.contains("content-type"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/hal+json"));
    }

    #[test]
    fn insert_if_absent_never_overwrites() {
        let mut headers = Headers::new();
        headers.insert("accept", "text/plain");
        assert!(!headers.insert_if_absent("Accept", ["application/hal+json"]));
        assert_eq!(headers.get_all("Accept"), ["text/plain".to_string()]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn append_keeps_value_order() {
        let headers: Headers = [("X-Tag", "a"), ("x-tag", "b"), ("Other", "c")]
            .into_iter()
            .collect();
        assert_eq!(headers.get_all("x-tag"), ["a".to_string(), "b".to_string()]);
        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["X-Tag", "Other"]);
    }

    #[test]
    fn insert_replaces_all_values() {
        let mut headers: Headers = [("x", "1"), ("x", "2")].into_iter().collect();
        headers.insert("X", "3");
        assert_eq!(headers.get_all("x"), ["3".to_string()]);
        assert_eq!(headers.remove("x"), Some(vec!["3".to_string()]));
        assert!(headers.is_empty());
    }

    #[test]
    fn headers_deserialize_from_map() {
        let headers: Headers =
            serde_json::from_str(r#"{"X-Api-Version":["2"],"Accept-Language":["en","fr"]}"#)
                .unwrap();
        assert_eq!(headers.get("x-api-version"), Some("2"));
        assert_eq!(headers.get_all("accept-language").len(), 2);
    }

    #[test]
    fn response_success_range() {
        let response = HttpResponse {
            status: 204,
            headers: Headers::new(),
            body: Vec::new(),
        };
        assert!(response.is_success());
        assert!(response.content_type().is_none());
    }
}
