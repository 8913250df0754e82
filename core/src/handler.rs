//! Delegating handlers wrapped around the transport.
//!
//! # Design
//! Handlers run in the order they were registered: the first handler sees
//! the request first and the response last. Each handler receives the
//! remainder of the chain as a [`Next`] and decides whether to forward,
//! rewrite or short-circuit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::Instrument;

use crate::error::BoxError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// A request/response interceptor.
#[async_trait]
pub trait DelegatingHandler: Send + Sync {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, BoxError>;
}

/// The rest of the chain after the current handler.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handlers: &'a [Arc<dyn DelegatingHandler>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        handlers: &'a [Arc<dyn DelegatingHandler>],
        transport: &'a dyn Transport,
    ) -> Self {
        Self {
            handlers,
            transport,
        }
    }

    /// Pass `request` to the next handler, or to the transport at the end.
    pub async fn run(self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        match self.handlers.split_first() {
            Some((handler, rest)) => {
                handler
                    .handle(request, Next::new(rest, self.transport))
                    .await
            }
            None => self.transport.send(request).await,
        }
    }
}

/// Emits a tracing span per exchange with method, url, status and latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

#[async_trait]
impl DelegatingHandler for LoggingHandler {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, BoxError> {
        let span = tracing::info_span!(
            "hal_request",
            method = %request.method,
            url = %request.url,
        );
        async move {
            let started = Instant::now();
            let result = next.run(request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(response) => {
                    tracing::info!(status = response.status, elapsed_ms, "response received")
                }
                Err(error) => tracing::warn!(%error, elapsed_ms, "transport failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Retries transport failures and `429`/`5xx` responses with a fixed delay.
#[derive(Debug, Clone)]
pub struct RetryHandler {
    max_attempts: u32,
    delay: Duration,
}

impl RetryHandler {
    /// `max_attempts` counts the first try; values below 1 are treated as 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    fn should_retry(response: &HttpResponse) -> bool {
        response.status == 429 || response.status >= 500
    }
}

#[async_trait]
impl DelegatingHandler for RetryHandler {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, BoxError> {
        let mut attempt = 1;
        loop {
            let result = next.run(request.clone()).await;
            let retry = match &result {
                Ok(response) => Self::should_retry(response),
                Err(_) => true,
            };
            if !retry || attempt >= self.max_attempts {
                return result;
            }
            tracing::debug!(attempt, url = %request.url, "retrying request");
            attempt += 1;
            tokio::time::sleep(self.delay).await;
        }
    }
}
