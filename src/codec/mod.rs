//! Serialization codecs for the protocol bindings

pub mod json;
pub mod sse;

use bytes::Bytes;
pub use json::JsonCodec;
pub use sse::SseCodec;

use crate::{
    protocol::{A2AError, A2AOperation},
    service::response::A2AResponse,
};

/// Codec trait for encoding and decoding A2A protocol messages
///
/// Different codecs implement different protocol bindings. Streaming operations are decoded by
/// [`SseCodec`] instead.
pub trait Codec: Send + Sync {
    /// Serialize an A2A operation to bytes for transport
    ///
    /// Operations without a body encode to empty bytes.
    fn encode_request(&self, operation: &A2AOperation) -> Result<Bytes, A2AError>;

    /// Deserialize a successful response body
    ///
    /// # Arguments
    ///
    /// * `body` - The response body bytes
    /// * `operation` - The original operation, which decides the expected shape
    fn decode_response(
        &self,
        body: &[u8],
        operation: &A2AOperation,
    ) -> Result<A2AResponse, A2AError>;

    /// Get the content type for this codec
    fn content_type(&self) -> &str;
}
