//! Request dispatch through the handler chain and typed response decoding.
//!
//! # Design
//! `HttpConnection` is immutable after construction: the handler chain,
//! transport, serializers and configuration are fixed, so one connection can
//! serve concurrent requests without locking. It turns 4xx/5xx responses into
//! `Error::Api` and leaves transport failures as `Error::Transport`; retries
//! belong in a handler.

use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::HalKitConfiguration;
use crate::error::{Error, Result};
use crate::handler::{DelegatingHandler, Next};
use crate::http::{Headers, HttpMethod, HttpRequest, HttpResponse};
use crate::response::ApiResponse;
use crate::serializer::{essence, JsonSerializer, Serializer};
use crate::transport::{ReqwestTransport, Transport};

pub struct HttpConnection {
    handlers: Vec<Arc<dyn DelegatingHandler>>,
    transport: Arc<dyn Transport>,
    serializers: Vec<Arc<dyn Serializer>>,
    configuration: Arc<HalKitConfiguration>,
}

impl HttpConnection {
    /// Connection over reqwest with the configured timeout and a JSON
    /// serializer.
    pub fn new(
        handlers: Vec<Arc<dyn DelegatingHandler>>,
        configuration: Arc<HalKitConfiguration>,
    ) -> Result<Self> {
        let transport =
            ReqwestTransport::with_timeout(configuration.timeout).map_err(Error::Transport)?;
        Ok(Self::with_transport(Arc::new(transport), handlers, configuration))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        handlers: Vec<Arc<dyn DelegatingHandler>>,
        configuration: Arc<HalKitConfiguration>,
    ) -> Self {
        let serializer = JsonSerializer::with_media_type(configuration.media_type.clone());
        Self {
            handlers,
            transport,
            serializers: vec![Arc::new(serializer)],
            configuration,
        }
    }

    /// Replace the serializers. The first one is the fallback when a
    /// response's content type matches none of them.
    pub fn with_serializers(mut self, serializers: Vec<Arc<dyn Serializer>>) -> Self {
        self.serializers = serializers;
        self
    }

    pub fn configuration(&self) -> &HalKitConfiguration {
        &self.configuration
    }

    pub fn handlers(&self) -> &[Arc<dyn DelegatingHandler>] {
        &self.handlers
    }

    /// Send a request and decode the response body into `T`.
    ///
    /// An empty body decodes as JSON `null`, so `Option<_>`, `()`,
    /// `NoContent` and `serde_json::Value` receive their empty value.
    pub async fn send_request<T, B>(
        &self,
        url: Url,
        method: HttpMethod,
        body: Option<&B>,
        headers: Headers,
    ) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let response = self.dispatch(url, method, body, headers).await?;
        let body_as_object = self.decode(&response)?;
        Ok(ApiResponse {
            status: response.status,
            headers: response.headers,
            body_as_object,
            raw_body: response.body,
        })
    }

    /// Send a request without decoding the body. Status checking still
    /// applies.
    pub async fn send_raw<B>(
        &self,
        url: Url,
        method: HttpMethod,
        body: Option<&B>,
        headers: Headers,
    ) -> Result<ApiResponse<()>>
    where
        B: Serialize + ?Sized + Sync,
    {
        let response = self.dispatch(url, method, body, headers).await?;
        Ok(ApiResponse {
            status: response.status,
            headers: response.headers,
            body_as_object: (),
            raw_body: response.body,
        })
    }

    async fn dispatch<B>(
        &self,
        url: Url,
        method: HttpMethod,
        body: Option<&B>,
        mut headers: Headers,
    ) -> Result<HttpResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let body = match body {
            Some(body) => {
                let serializer = self.request_serializer()?;
                let value =
                    serde_json::to_value(body).map_err(|e| Error::Serialization(e.to_string()))?;
                let bytes = serializer
                    .serialize(&value)
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                headers.insert_if_absent("Content-Type", [serializer.media_type()]);
                Some(bytes)
            }
            None => None,
        };
        check_headers(&headers)?;

        debug!(%method, %url, "sending request");
        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };
        let response = Next::new(&self.handlers, self.transport.as_ref())
            .run(request)
            .await
            .map_err(Error::Transport)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");

        if response.status >= 400 {
            return Err(Error::Api {
                status: response.status,
                headers: response.headers,
                body: response.body,
            });
        }
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(&self, response: &HttpResponse) -> Result<T> {
        let value = if response.body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            self.response_serializer(response.content_type())?
                .deserialize(&response.body)
                .map_err(|e| Error::Serialization(e.to_string()))?
        };
        serde_json::from_value(value).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn request_serializer(&self) -> Result<&dyn Serializer> {
        let wanted = essence(&self.configuration.media_type);
        self.pick(|s| s.can_handle(&wanted))
    }

    fn response_serializer(&self, content_type: Option<&str>) -> Result<&dyn Serializer> {
        match content_type.map(essence) {
            Some(ct) => self.pick(|s| s.can_handle(&ct)),
            None => self.pick(|_| false),
        }
    }

    /// First serializer matching `accepts`, else the first configured one.
    fn pick(&self, accepts: impl Fn(&dyn Serializer) -> bool) -> Result<&dyn Serializer> {
        self.serializers
            .iter()
            .find(|s| accepts(&***s))
            .or_else(|| self.serializers.first())
            .map(|s| &**s)
            .ok_or_else(|| Error::Serialization("no serializer configured".to_string()))
    }
}

/// Reject header names and values that could never go on the wire, before
/// any handler sees the request.
fn check_headers(headers: &Headers) -> Result<()> {
    for (name, values) in headers.iter() {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidArgument(format!("header name '{name}': {e}")))?;
        for value in values {
            HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidArgument(format!("header '{name}' value: {e}")))?;
        }
    }
    Ok(())
}

impl std::fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection")
            .field("handlers", &self.handlers.len())
            .field("serializers", &self.serializers.len())
            .field("configuration", &self.configuration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use std::time::Duration;

    use super::*;
    use crate::error::BoxError;
    use crate::handler::tests::{response, ScriptedTransport};
    use crate::handler::RetryHandler;
    use crate::response::NoContent;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        id: u32,
        total: f64,
    }

    fn connection(transport: Arc<ScriptedTransport>) -> HttpConnection {
        HttpConnection::with_transport(
            transport,
            Vec::new(),
            Arc::new(HalKitConfiguration::default()),
        )
    }

    fn url() -> Url {
        Url::parse("https://api.example.com/orders/1").unwrap()
    }

    #[tokio::test]
    async fn decodes_body_and_keeps_metadata() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(
            200,
            r#"{"id":1,"total":9.5}"#,
        ))]));
        let conn = connection(transport.clone());

        let response: ApiResponse<Order> = conn
            .send_request(url(), HttpMethod::Get, None::<&()>, Headers::new())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body_as_object, Order { id: 1, total: 9.5 });
        assert_eq!(response.content_type(), Some("application/hal+json"));
        assert_eq!(response.raw_body, br#"{"id":1,"total":9.5}"#);
        assert!(transport.sent()[0].body.is_none());
    }

    #[tokio::test]
    async fn body_is_serialized_with_media_type() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(201, ""))]));
        let conn = connection(transport.clone());

        let _: ApiResponse<NoContent> = conn
            .send_request(
                url(),
                HttpMethod::Post,
                Some(&serde_json::json!({"total": 3})),
                Headers::new(),
            )
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].headers.get("content-type"), Some("application/hal+json"));
        let body: Value = serde_json::from_slice(sent[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["total"], 3);
    }

    #[tokio::test]
    async fn error_status_becomes_api_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(
            404,
            r#"{"error":"not found"}"#,
        ))]));
        let conn = connection(transport);

        let err = conn
            .send_request::<Order, ()>(url(), HttpMethod::Get, None, Headers::new())
            .await
            .unwrap_err();

        match err {
            Error::Api {
                status,
                headers,
                body,
            } => {
                assert_eq!(status, 404);
                assert_eq!(headers.get("content-type"), Some("application/hal+json"));
                assert_eq!(body, br#"{"error":"not found"}"#);
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_body_decodes_to_empty_value() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(204, "")),
            Ok(response(200, "  ")),
        ]));
        let conn = connection(transport);

        let none: ApiResponse<Option<Order>> = conn
            .send_request(url(), HttpMethod::Get, None::<&()>, Headers::new())
            .await
            .unwrap();
        assert!(none.body_as_object.is_none());

        let marker: ApiResponse<NoContent> = conn
            .send_request(url(), HttpMethod::Get, None::<&()>, Headers::new())
            .await
            .unwrap();
        assert_eq!(marker.status, 200);
    }

    #[tokio::test]
    async fn shape_mismatch_is_serialization_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(200, r#"{"unexpected":true}"#)),
            Ok(response(200, "<html>")),
        ]));
        let conn = connection(transport);

        for _ in 0..2 {
            let err = conn
                .send_request::<Order, ()>(url(), HttpMethod::Get, None, Headers::new())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Serialization(_)), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn transport_failure_is_propagated() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err("timed out".to_string())]));
        let conn = connection(transport);

        let err = conn
            .send_request::<Order, ()>(url(), HttpMethod::Get, None, Headers::new())
            .await
            .unwrap_err();

        match err {
            Error::Transport(source) => assert_eq!(source.to_string(), "timed out"),
            other => panic!("expected Transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_headers_are_rejected_before_the_chain() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(200, "{}")),
            Ok(response(200, "{}")),
        ]));
        let handlers: Vec<Arc<dyn DelegatingHandler>> =
            vec![Arc::new(RetryHandler::new(3, Duration::ZERO))];
        let conn = HttpConnection::with_transport(
            transport.clone(),
            handlers,
            Arc::new(HalKitConfiguration::default()),
        );

        for headers in [
            Headers::from_iter([("X-Trace", "a\nb")]),
            Headers::from_iter([("Bad Name", "ok")]),
        ] {
            let err = conn
                .send_request::<Value, ()>(url(), HttpMethod::Get, None, headers)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "got {err:?}");
        }
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn send_raw_skips_decoding() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(200, "not json"))]));
        let conn = connection(transport);

        let response = conn
            .send_raw::<()>(url(), HttpMethod::Delete, None, Headers::new())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.raw_body, b"not json");
    }

    struct UpperSerializer;

    impl Serializer for UpperSerializer {
        fn media_type(&self) -> &str {
            "text/x-upper"
        }

        fn can_handle(&self, content_type: &str) -> bool {
            content_type == "text/x-upper"
        }

        fn serialize(&self, value: &Value) -> std::result::Result<Vec<u8>, BoxError> {
            Ok(value.to_string().to_uppercase().into_bytes())
        }

        fn deserialize(&self, bytes: &[u8]) -> std::result::Result<Value, BoxError> {
            Ok(Value::String(String::from_utf8(bytes.to_vec())?.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn serializer_is_selected_by_content_type() {
        let mut upper = response(200, "shout");
        upper.headers.insert("Content-Type", "text/x-upper; charset=utf-8");
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(upper),
            Ok(response(200, r#""quiet""#)),
        ]));
        let conn = connection(transport).with_serializers(vec![
            Arc::new(JsonSerializer::new()),
            Arc::new(UpperSerializer),
        ]);

        let first: ApiResponse<String> = conn
            .send_request(url(), HttpMethod::Get, None::<&()>, Headers::new())
            .await
            .unwrap();
        let second: ApiResponse<String> = conn
            .send_request(url(), HttpMethod::Get, None::<&()>, Headers::new())
            .await
            .unwrap();

        assert_eq!(first.body_as_object, "SHOUT");
        assert_eq!(second.body_as_object, "quiet");
    }
}
