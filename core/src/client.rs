//! The public façade for navigating a HAL API.
//!
//! # Design
//! `HalClient` holds a connection, a shared configuration and a link
//! resolver, all fixed at construction. Every verb resolves the link, adds
//! negotiation headers the caller did not set and dispatches through the
//! connection. Typed verbs return only the decoded body; `delete` and
//! `send_request` return the whole envelope.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::HalKitConfiguration;
use crate::connection::HttpConnection;
use crate::error::{Error, Result};
use crate::http::{Headers, HttpMethod, Parameters};
use crate::link::Link;
use crate::resolver::{LinkResolver, UriTemplateResolver};
use crate::resource::RootResource;
use crate::response::ApiResponse;

/// Per-call template parameters and headers. Both default to empty.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub parameters: Parameters,
    pub headers: Headers,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }
}

impl From<Parameters> for RequestOptions {
    fn from(parameters: Parameters) -> Self {
        Self {
            parameters,
            headers: Headers::new(),
        }
    }
}

impl From<Headers> for RequestOptions {
    fn from(headers: Headers) -> Self {
        Self {
            parameters: Parameters::new(),
            headers,
        }
    }
}

pub struct HalClient {
    connection: HttpConnection,
    configuration: Arc<HalKitConfiguration>,
    resolver: Arc<dyn LinkResolver>,
}

impl HalClient {
    /// Fails with `Error::InvalidArgument` if the configuration has no root
    /// endpoint.
    pub fn new(
        connection: HttpConnection,
        configuration: Arc<HalKitConfiguration>,
        resolver: Arc<dyn LinkResolver>,
    ) -> Result<Self> {
        if configuration.root_endpoint.is_none() {
            return Err(Error::InvalidArgument(
                "configuration must have a root endpoint".to_string(),
            ));
        }
        Ok(Self {
            connection,
            configuration,
            resolver,
        })
    }

    /// Client over reqwest with no handlers, resolving relative hrefs
    /// against the root endpoint.
    pub fn with_configuration(configuration: HalKitConfiguration) -> Result<Self> {
        let root = configuration.root_endpoint.clone().ok_or_else(|| {
            Error::InvalidArgument("configuration must have a root endpoint".to_string())
        })?;
        let configuration = Arc::new(configuration);
        let connection = HttpConnection::new(Vec::new(), configuration.clone())?;
        Self::new(
            connection,
            configuration,
            Arc::new(UriTemplateResolver::with_base(root)),
        )
    }

    pub fn configuration(&self) -> &HalKitConfiguration {
        &self.configuration
    }

    pub fn connection(&self) -> &HttpConnection {
        &self.connection
    }

    pub fn resolver(&self) -> &dyn LinkResolver {
        self.resolver.as_ref()
    }

    /// GET the configured root endpoint. The root URL is sent as configured:
    /// it is never expanded as a template, so `options.parameters` is unused.
    pub async fn get_root(&self, options: RequestOptions) -> Result<RootResource> {
        let root = self.configuration.root_endpoint.clone().ok_or_else(|| {
            Error::InvalidArgument("configuration must have a root endpoint".to_string())
        })?;
        let headers = self.negotiate(options.headers);
        self.connection
            .send_request::<RootResource, ()>(root, HttpMethod::Get, None, headers)
            .await
            .map(ApiResponse::into_body)
    }

    /// GET `link` and decode the body into `T`.
    ///
    /// An empty body decodes as JSON `null`: request `Option<T>` or
    /// [`NoContent`](crate::NoContent) when the server may answer without
    /// one, since a plain struct fails with `Error::Serialization`. The same
    /// holds for `post`, `put` and `patch`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        link: &Link,
        options: RequestOptions,
    ) -> Result<T> {
        self.send_request::<T, ()>(link, HttpMethod::Get, None, options)
            .await
            .map(ApiResponse::into_body)
    }

    /// POST `body` to `link` and decode the response into `T`.
    pub async fn post<T, B>(&self, link: &Link, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.send_request(link, HttpMethod::Post, Some(body), options)
            .await
            .map(ApiResponse::into_body)
    }

    /// PUT `body` to `link` and decode the response into `T`.
    pub async fn put<T, B>(&self, link: &Link, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.send_request(link, HttpMethod::Put, Some(body), options)
            .await
            .map(ApiResponse::into_body)
    }

    /// PATCH `body` to `link` and decode the response into `T`.
    pub async fn patch<T, B>(&self, link: &Link, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.send_request(link, HttpMethod::Patch, Some(body), options)
            .await
            .map(ApiResponse::into_body)
    }

    /// DELETE and return the full envelope. The body is not decoded; it is
    /// available as `raw_body`.
    pub async fn delete(&self, link: &Link, options: RequestOptions) -> Result<ApiResponse<()>> {
        let (url, headers) = self.prepare(link, options)?;
        self.connection
            .send_raw::<()>(url, HttpMethod::Delete, None, headers)
            .await
    }

    /// Dispatch any verb and return the full envelope.
    pub async fn send_request<T, B>(
        &self,
        link: &Link,
        method: HttpMethod,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let (url, headers) = self.prepare(link, options)?;
        self.connection
            .send_request(url, method, body, headers)
            .await
    }

    fn prepare(&self, link: &Link, options: RequestOptions) -> Result<(Url, Headers)> {
        let url = self.resolver.resolve(link, &options.parameters)?;
        Ok((url, self.negotiate(options.headers)))
    }

    /// Add `Accept` and the configured default headers without overwriting
    /// anything the caller supplied.
    fn negotiate(&self, mut headers: Headers) -> Headers {
        headers.insert_if_absent("Accept", [self.configuration.media_type.as_str()]);
        for (name, values) in self.configuration.default_headers.iter() {
            headers.insert_if_absent(name, values.iter().cloned());
        }
        headers
    }
}

impl std::fmt::Debug for HalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HalClient")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
