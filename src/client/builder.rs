//! Client builder for constructing A2A clients with composable layers

use std::{sync::Arc, time::Duration};

use tower::ServiceBuilder;
use url::Url;

use crate::{
    client::{AgentClient, ClientConfig},
    codec::{Codec, JsonCodec},
    layer::{A2AValidationLayer, A2AValidationService, RetryLayer, RetryPolicy, RetryService},
    protocol::A2AError,
    server::TaskHandler,
    service::A2AProtocolService,
    transport::{HttpTransport, LocalTransport, Transport},
};

/// Service stack assembled by [`A2AClientBuilder`]: retry, then validation, then the protocol
/// service over the transport
pub type ClientService<T> = RetryService<A2AValidationService<A2AProtocolService<T>>>;

/// Builder for constructing A2A clients
///
/// This builder provides a fluent API for configuring and building an A2A client with
/// customizable transport, timeouts and retry policy.
///
/// # Example
///
/// ```rust,no_run
/// use a2a_taskhub::prelude::*;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let url = "https://agent.example.com".parse().unwrap();
/// let mut client = A2AClientBuilder::new_http(url)
///     .with_timeout(Duration::from_secs(60))
///     .with_max_retries(5)
///     .build()?;
///
/// let agent_card = client.discover().await?;
/// println!("Connected to: {}", agent_card.name);
/// # Ok(())
/// # }
/// ```
///
/// # Compiler Error
/// This will fail to compile if it is not clear to the compiler which type implementing
/// `Transport` is being used as underlying transport. This is expected behaviour.
///
/// ```compile_fail
/// let client = A2AClientBuilder::new(agent_url()).build();
/// ```
pub struct A2AClientBuilder<T: Transport> {
    agent_url: Url,
    transport: Option<T>,
    codec: Option<Arc<dyn Codec>>,
    timeout: Duration,
    retry: RetryPolicy,
    max_reconnects: u32,
}

impl<T: Transport> A2AClientBuilder<T> {
    /// Start a builder for the agent at `agent_url`; a transport must be supplied
    pub fn new(agent_url: Url) -> Self {
        Self {
            agent_url,
            transport: None,
            codec: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            max_reconnects: 5,
        }
    }

    /// Use a custom transport
    ///
    /// # Arguments
    ///
    /// * `transport` - The transport implementation to use
    pub fn with_transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom codec
    ///
    /// # Arguments
    ///
    /// * `codec` - The codec implementation to use
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy used for requests and stream reconnects
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the maximum number of retries after the first attempt
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Maximum number of retries (default: 2)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry = self.retry.with_max_attempts(max_retries.saturating_add(1));
        self
    }

    /// Set how many times a task stream may reconnect
    pub fn with_max_reconnects(mut self, max_reconnects: u32) -> Self {
        self.max_reconnects = max_reconnects;
        self
    }

    /// Build the A2A client
    ///
    /// This assembles all the Tower layers and returns a configured client.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport has been configured
    pub fn build(self) -> Result<AgentClient<ClientService<T>>, A2AError> {
        let transport = self.transport.ok_or_else(|| {
            A2AError::Validation(
                "Transport not configured. Use new_http(), new_local() or with_transport()".into(),
            )
        })?;
        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonCodec));

        let service = ServiceBuilder::new()
            .layer(RetryLayer::new(self.retry.clone()))
            .layer(A2AValidationLayer::new())
            .service(A2AProtocolService::new(transport, codec));

        let config = ClientConfig::new(self.agent_url)
            .with_timeout(self.timeout)
            .with_retry(self.retry)
            .with_max_reconnects(self.max_reconnects);

        Ok(AgentClient::new(service, config))
    }
}

impl A2AClientBuilder<HttpTransport> {
    /// Create a new client builder with HTTP transport (HTTP+JSON binding)
    ///
    /// # Arguments
    ///
    /// * `agent_url` - The base URL of the agent (e.g., "<https://agent.example.com>")
    pub fn new_http(agent_url: Url) -> Self {
        let transport = HttpTransport::new(agent_url.clone());
        Self::new(agent_url)
            .with_transport(transport)
            .with_codec(Arc::new(JsonCodec))
    }
}

impl A2AClientBuilder<LocalTransport> {
    /// Create a client builder that talks to a handler in the same process
    pub fn new_local(agent_url: Url, handler: TaskHandler) -> Self {
        let transport = LocalTransport::new(handler, agent_url.clone());
        Self::new(agent_url)
            .with_transport(transport)
            .with_codec(Arc::new(JsonCodec))
    }
}
