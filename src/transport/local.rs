//! In-process transport
//!
//! Routes requests straight into a [`TaskHandler`] without a network hop. Requests and
//! responses still go through the wire encoding, so a client on this transport sees exactly
//! what an HTTP client would.

use std::task::{Context, Poll};

use async_trait::async_trait;
use url::Url;

use super::{ByteStream, Transport, TransportRequest, TransportResponse};
use crate::{protocol::A2AError, server::TaskHandler};

/// Transport that serves requests from a task handler in the same process
#[derive(Clone, Debug)]
pub struct LocalTransport {
    handler: TaskHandler,
    base_url: Url,
}

impl LocalTransport {
    /// Create a transport for `handler`, identified by `base_url`
    pub fn new(handler: TaskHandler, base_url: Url) -> Self {
        Self { handler, base_url }
    }

    /// The handler requests are routed to
    pub fn handler(&self) -> &TaskHandler {
        &self.handler
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), A2AError>> {
        Poll::Ready(Ok(()))
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, A2AError> {
        Ok(self.handler.handle(request).await)
    }

    async fn execute_streaming(&self, request: TransportRequest) -> Result<ByteStream, A2AError> {
        self.handler.handle_stream(request).await
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{protocol::AgentCard, server::TaskManager};

    #[tokio::test]
    async fn test_local_transport_serves_agent_card() {
        let card = AgentCard::builder("local-agent")
            .version("0.1.0")
            .capability("echo")
            .build()
            .unwrap();
        let transport = LocalTransport::new(
            TaskHandler::new(TaskManager::new(card)),
            Url::parse("local://local-agent").unwrap(),
        );

        let response = transport
            .execute(TransportRequest::new("/.well-known/agent-card.json", "GET"))
            .await
            .unwrap();
        assert!(response.is_success());
        let card: AgentCard = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(card.name, "local-agent");
        assert!(transport.supports_streaming());
    }
}
