//! Core A2A protocol service implementation

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use tower_service::Service;
use tracing::debug;

use crate::{
    codec::{Codec, SseCodec},
    protocol::{A2AError, A2AOperation, RemoteError},
    service::{request::REQUEST_ID_HEADER, response::EventFeed, A2ARequest, A2AResponse},
    transport::{Transport, TransportRequest, TransportResponse},
};

/// Core A2A protocol service that wraps a transport
///
/// This service implements the Tower `Service` trait and provides the core logic for executing
/// A2A operations over any transport. Single-response operations are decoded with the
/// configured codec; subscriptions are decoded as SSE into an [`EventFeed`].
pub struct A2AProtocolService<T> {
    transport: T,
    codec: Arc<dyn Codec>,
}

impl<T> A2AProtocolService<T>
where
    T: Transport,
{
    /// Create a new A2A protocol service
    ///
    /// # Arguments
    ///
    /// * `transport` - The underlying transport implementation
    /// * `codec` - The codec for serialization/deserialization
    pub fn new(transport: T, codec: Arc<dyn Codec>) -> Self {
        Self { transport, codec }
    }

    /// The transport requests are sent over
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build a transport request from an A2A operation
    fn build_transport_request(
        req: &A2ARequest,
        codec: &dyn Codec,
    ) -> Result<TransportRequest, A2AError> {
        let method = req.operation.method();
        let accept = if req.operation.is_streaming() {
            "text/event-stream"
        } else {
            codec.content_type()
        };

        let mut transport_req = TransportRequest::new(req.operation.endpoint(), method)
            .header("Content-Type", codec.content_type())
            .header("Accept", accept)
            .header("A2A-Version", "1.0")
            .header(REQUEST_ID_HEADER, req.context.request_id.clone());

        for (key, value) in &req.context.headers {
            transport_req = transport_req.header(key.clone(), value.clone());
        }

        let body = codec.encode_request(&req.operation)?;
        if !body.is_empty() && method != "GET" {
            transport_req = transport_req.body(body);
        }

        Ok(transport_req)
    }

    /// Parse a transport response into an A2A response
    fn parse_transport_response(
        transport_resp: TransportResponse,
        codec: &dyn Codec,
        operation: &A2AOperation,
    ) -> Result<A2AResponse, A2AError> {
        if !transport_resp.is_success() {
            return Err(A2AError::from_response(
                transport_resp.status,
                &transport_resp.body,
            ));
        }

        codec.decode_response(&transport_resp.body, operation)
    }
}

async fn with_timeout<F, R>(limit: Option<Duration>, fut: F) -> Result<R, A2AError>
where
    F: Future<Output = Result<R, A2AError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| A2AError::from(RemoteError::Timeout))?,
        None => fut.await,
    }
}

impl<T> Service<A2ARequest> for A2AProtocolService<T>
where
    T: Transport + Clone,
{
    type Response = A2AResponse;
    type Error = A2AError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.transport.poll_ready(cx)
    }

    fn call(&mut self, req: A2ARequest) -> Self::Future {
        let transport = self.transport.clone();
        let codec = self.codec.clone();

        Box::pin(async move {
            let transport_req = Self::build_transport_request(&req, codec.as_ref())?;
            debug!(
                method = %transport_req.method,
                endpoint = %transport_req.endpoint,
                request_id = %req.context.request_id,
                "sending request"
            );

            if req.operation.is_streaming() {
                if !transport.supports_streaming() {
                    return Err(RemoteError::Protocol(format!(
                        "transport for {} cannot stream task events",
                        transport.base_url()
                    ))
                    .into());
                }
                let bytes = with_timeout(
                    req.context.timeout,
                    transport.execute_streaming(transport_req),
                )
                .await?;
                let events = SseCodec::new().parse_stream(bytes);
                return Ok(A2AResponse::Events(EventFeed::new(events)));
            }

            let transport_resp =
                with_timeout(req.context.timeout, transport.execute(transport_req)).await?;

            Self::parse_transport_response(transport_resp, codec.as_ref(), &req.operation)
        })
    }
}

impl<T> Clone for A2AProtocolService<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            codec: self.codec.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::{
        codec::JsonCodec,
        protocol::{Task, TaskState},
        service::RequestContext,
        transport::mock::MockTransport,
    };

    #[tokio::test]
    async fn test_service_create_task() {
        let transport = MockTransport::new(|_, req| {
            assert_eq!(req.method, "POST");
            assert_eq!(req.endpoint, "/tasks");
            assert!(req.headers.contains_key(REQUEST_ID_HEADER));
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            assert_eq!(body["kind"], "echo");

            let task = Task::new("task-123", "echo", body["input"].clone());
            Ok(TransportResponse::new(201).body(Bytes::from(serde_json::to_vec(&task).unwrap())))
        });

        let mut service = A2AProtocolService::new(transport, Arc::new(JsonCodec));
        let operation = A2AOperation::CreateTask {
            kind: "echo".into(),
            input: json!("Hello"),
            metadata: HashMap::new(),
            task_id: None,
        };

        let response = service
            .call(A2ARequest::new(operation, RequestContext::default()))
            .await
            .unwrap();

        match response {
            A2AResponse::Task(task) => {
                assert_eq!(task.id, "task-123");
                assert_eq!(task.state, TaskState::Submitted);
            }
            other => panic!("Expected Task response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_service_error_body_translation() {
        let transport = MockTransport::new(|_, _| {
            let body = A2AError::TaskTerminal {
                task_id: "task-123".into(),
                state: TaskState::Completed,
            }
            .to_body();
            Ok(TransportResponse::new(409).body(Bytes::from(serde_json::to_vec(&body).unwrap())))
        });

        let mut service = A2AProtocolService::new(transport, Arc::new(JsonCodec));
        let operation = A2AOperation::ProvideInput {
            task_id: "task-123".to_string(),
            input: json!("late"),
        };

        let result = service
            .call(A2ARequest::new(operation, RequestContext::default()))
            .await;

        assert!(matches!(
            result,
            Err(A2AError::TaskTerminal {
                state: TaskState::Completed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_service_times_out() {
        #[derive(Clone)]
        struct Stalled(url::Url);

        #[async_trait::async_trait]
        impl Transport for Stalled {
            fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), A2AError>> {
                Poll::Ready(Ok(()))
            }

            async fn execute(
                &self,
                _request: TransportRequest,
            ) -> Result<TransportResponse, A2AError> {
                futures::future::pending().await
            }

            fn base_url(&self) -> &url::Url {
                &self.0
            }
        }

        let transport = Stalled(url::Url::parse("mock://stalled").unwrap());
        let mut service = A2AProtocolService::new(transport, Arc::new(JsonCodec));
        let context = RequestContext::default().with_timeout(Duration::from_millis(20));

        let result = service
            .call(A2ARequest::new(A2AOperation::DiscoverAgent, context))
            .await;
        assert!(matches!(result, Err(A2AError::Remote(RemoteError::Timeout))));
    }

    #[tokio::test]
    async fn test_streaming_unsupported_by_transport() {
        let transport = MockTransport::json(200, json!({}));
        let mut service = A2AProtocolService::new(transport, Arc::new(JsonCodec));
        let operation = A2AOperation::SubscribeTask {
            task_id: "task-1".into(),
        };

        let result = service
            .call(A2ARequest::new(operation, RequestContext::default()))
            .await;
        assert!(matches!(
            result,
            Err(A2AError::Remote(RemoteError::Protocol(_)))
        ));
    }
}
