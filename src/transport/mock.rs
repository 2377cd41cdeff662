use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use async_trait::async_trait;
use url::Url;

use crate::{
    protocol::A2AError,
    transport::{Transport, TransportRequest, TransportResponse},
};

type Handler = dyn Fn(usize, TransportRequest) -> Result<TransportResponse, A2AError> + Send + Sync;

/// Mock transport for internal testing
///
/// The handler receives the zero-based call number, so tests can script failures for the
/// first few attempts.
#[derive(Clone)]
pub(crate) struct MockTransport {
    handler: Arc<Handler>,
    calls: Arc<AtomicUsize>,
    base_url: Url,
}

impl MockTransport {
    /// Create a new mock transport with a custom request handler
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(usize, TransportRequest) -> Result<TransportResponse, A2AError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Arc::new(handler),
            calls: Arc::new(AtomicUsize::new(0)),
            base_url: Url::parse("mock://agent").unwrap(),
        }
    }

    /// Create a mock transport that always answers with `status` and a JSON body
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::new(move |_, _| {
            Ok(TransportResponse::new(status).body(bytes::Bytes::from(body.to_string())))
        })
    }

    /// Number of requests executed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), A2AError>> {
        Poll::Ready(Ok(()))
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, A2AError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.handler)(call, request)
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.calls())
            .finish()
    }
}
