//! Transport abstraction layer for A2A protocol

pub mod http;
pub mod local;
#[cfg(test)]
pub(crate) mod mock;

use std::{
    collections::HashMap,
    task::{Context, Poll},
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
pub use http::HttpTransport;
pub use local::LocalTransport;
use url::{form_urlencoded, Url};

use crate::protocol::{A2AError, RemoteError};

/// Raw bytes of a streaming response body
pub type ByteStream = BoxStream<'static, Result<Bytes, A2AError>>;

/// Protocol-agnostic transport request
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The endpoint path, with query (e.g., "/tasks", "/tasks?state=working")
    pub endpoint: String,

    /// HTTP method or equivalent operation (e.g., "POST", "GET")
    pub method: String,

    /// Headers or metadata for the request
    pub headers: HashMap<String, String>,

    /// Request body as bytes
    pub body: Bytes,
}

impl TransportRequest {
    /// Create a new transport request
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header to the request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Endpoint without its query string
    pub fn path(&self) -> &str {
        self.endpoint
            .split_once('?')
            .map_or(self.endpoint.as_str(), |(path, _)| path)
    }

    /// Decoded query parameters of the endpoint
    pub fn query(&self) -> HashMap<String, String> {
        self.endpoint
            .split_once('?')
            .map(|(_, query)| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }
}

/// Protocol-agnostic transport response
#[derive(Debug)]
pub struct TransportResponse {
    /// Status code (e.g., HTTP status code)
    pub status: u16,

    /// Response headers or metadata
    pub headers: HashMap<String, String>,

    /// Response body as bytes
    pub body: Bytes,
}

impl TransportResponse {
    /// Create a new transport response
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header to the response
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the response body
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Check if the response indicates success (2xx status code)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Core transport trait for executing protocol-agnostic requests
///
/// Abstracts over the binding used to reach an agent (HTTP, in-process) so the protocol layer
/// works with any of them.
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    /// Check if the transport is ready to accept requests
    ///
    /// This is used by Tower's Service trait to implement backpressure
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), A2AError>>;

    /// Execute a request that yields a single response
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, A2AError>;

    /// Execute a request whose response body is an open-ended event stream
    ///
    /// Non-success statuses are turned into errors before the stream is returned.
    async fn execute_streaming(&self, request: TransportRequest) -> Result<ByteStream, A2AError> {
        Err(RemoteError::Protocol(format!(
            "{} does not support streaming requests to {}",
            self.base_url(),
            request.endpoint
        ))
        .into())
    }

    /// Get the base URL or identifier for this transport
    ///
    /// For HTTP transports, this would be the base URL (e.g., "<https://agent.example.com>")
    /// For in-process transports, this is "local://<agent>"
    fn base_url(&self) -> &Url;

    /// Check if this transport supports streaming responses
    fn supports_streaming(&self) -> bool {
        false
    }
}

#[async_trait]
impl<T: Transport> Transport for Box<T> {
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), A2AError>> {
        (**self).poll_ready(cx)
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, A2AError> {
        (**self).execute(request).await
    }

    async fn execute_streaming(&self, request: TransportRequest) -> Result<ByteStream, A2AError> {
        (**self).execute_streaming(request).await
    }

    fn base_url(&self) -> &Url {
        (**self).base_url()
    }

    fn supports_streaming(&self) -> bool {
        (**self).supports_streaming()
    }
}
