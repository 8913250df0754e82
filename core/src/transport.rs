//! The network boundary.
//!
//! `Transport` is the innermost step of the handler chain. `ReqwestTransport`
//! is the default implementation; connection pooling and TLS are reqwest's
//! concern and are configured once, when the transport is built.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;

use crate::error::BoxError;
use crate::http::{Headers, HttpMethod, HttpRequest, HttpResponse};

/// Executes one request. Failures are returned as-is; no retries here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client with an optional overall request timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, BoxError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(builder.build()?))
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url);
        for (name, values) in request.headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            for value in values {
                builder = builder.header(name.clone(), HeaderValue::from_str(value)?);
            }
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
