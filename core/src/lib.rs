//! Client core for hypermedia APIs that follow HAL.
//!
//! # Overview
//! Resources expose typed relations (links) instead of fixed endpoints. This
//! crate turns a [`Link`] plus per-call parameters into a URL, sends the
//! request through a chain of delegating handlers and decodes the response
//! into a caller-chosen type.
//!
//! # Design
//! - [`UriTemplateResolver`] expands RFC 6570 templates; it never appends
//!   parameters that the template does not name.
//! - [`HttpConnection`] owns the handler chain, transport and serializers.
//!   4xx/5xx responses become [`Error::Api`]; transport failures pass through
//!   as [`Error::Transport`].
//! - [`HalClient`] adds `Accept` and configured default headers only where
//!   the caller left them unset.
//! - Everything is immutable after construction, so a client can be shared
//!   across tasks without locking.
//!
//! ```no_run
//! # async fn run() -> halkit::Result<()> {
//! use halkit::{HalClient, HalKitConfiguration, RequestOptions};
//!
//! let client = HalClient::with_configuration(HalKitConfiguration::with_root(
//!     "https://api.example.com/",
//! )?)?;
//! let root = client.get_root(RequestOptions::new()).await?;
//! if let Some(orders) = root.link("ea:orders") {
//!     let page: serde_json::Value = client
//!         .get(orders, RequestOptions::new().parameter("page", "2"))
//!         .await?;
//!     println!("{page}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod http;
pub mod link;
pub mod resolver;
pub mod resource;
pub mod response;
pub mod serializer;
pub mod transport;

pub use client::{HalClient, RequestOptions};
pub use config::HalKitConfiguration;
pub use connection::HttpConnection;
pub use error::{BoxError, Error, Result};
pub use handler::{DelegatingHandler, LoggingHandler, Next, RetryHandler};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse, Parameters};
pub use link::{Link, LinkEntry, Links};
pub use resolver::{LinkResolver, UriTemplateResolver};
pub use resource::{Resource, RootResource};
pub use response::{ApiResponse, NoContent};
pub use serializer::{JsonSerializer, Serializer};
pub use transport::{ReqwestTransport, Transport};
