//! Hypermedia links as they appear in HAL `_links` objects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A relation plus the href (or URI template) that reaches it.
///
/// Immutable once built: the builder methods consume and return `self`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Relation name. HAL stores it as the `_links` key, so it is filled in
    /// by [`Links`] rather than read from the link object.
    #[serde(skip)]
    pub rel: Option<String>,
    pub href: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub templated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        let href = href.into();
        Self {
            templated: href.contains('{'),
            rel: None,
            href,
            title: None,
            name: None,
        }
    }

    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        self.rel = Some(rel.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Variable names referenced by the href's template expressions, in
    /// order of first appearance. Malformed expressions are skipped.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut rest = self.href.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let expr = &rest[start + 1..start + len];
            let expr = expr.trim_start_matches(['+', '#', '.', '/', ';', '?', '&']);
            for spec in expr.split(',') {
                let name = spec
                    .split(':')
                    .next()
                    .unwrap_or_default()
                    .trim_end_matches('*');
                if !name.is_empty() && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            rest = &rest[start + len + 1..];
        }
        names
    }
}

/// One `_links` entry: HAL allows a single link object or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkEntry {
    One(Link),
    Many(Vec<Link>),
}

/// The `_links` object of a HAL resource, keyed by relation name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, LinkEntry>", into = "BTreeMap<String, LinkEntry>")]
pub struct Links {
    entries: BTreeMap<String, LinkEntry>,
}

impl Links {
    /// The first link for `rel`.
    pub fn get(&self, rel: &str) -> Option<&Link> {
        match self.entries.get(rel)? {
            LinkEntry::One(link) => Some(link),
            LinkEntry::Many(links) => links.first(),
        }
    }

    pub fn get_all(&self, rel: &str) -> &[Link] {
        match self.entries.get(rel) {
            Some(LinkEntry::One(link)) => std::slice::from_ref(link),
            Some(LinkEntry::Many(links)) => links,
            None => &[],
        }
    }

    pub fn rels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<String, LinkEntry>> for Links {
    fn from(mut entries: BTreeMap<String, LinkEntry>) -> Self {
        for (rel, entry) in entries.iter_mut() {
            match entry {
                LinkEntry::One(link) => link.rel = Some(rel.clone()),
                LinkEntry::Many(links) => {
                    for link in links {
                        link.rel = Some(rel.clone());
                    }
                }
            }
        }
        Links { entries }
    }
}

impl From<Links> for BTreeMap<String, LinkEntry> {
    fn from(links: Links) -> Self {
        links.entries
    }
}
