//! Remote transport used to replay queued operations.
//!
//! The queue only needs to know whether a call succeeded. Authentication,
//! status translation, and timeouts belong to the transport implementation.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use tether_engine::{Collection, EntityId, FailureClass, ReplayRequest};

/// Errors returned by a transport call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl TransportError {
    /// Classify the failure for the retry policy.
    ///
    /// Client errors other than 408 and 429 will fail the same way on every
    /// attempt; everything else may succeed later.
    pub fn class(&self) -> FailureClass {
        match self {
            TransportError::Status { status, .. }
                if (400..500).contains(status) && *status != 408 && *status != 429 =>
            {
                FailureClass::Terminal
            }
            _ => FailureClass::Retryable,
        }
    }
}

/// Result type for transport calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// An HTTP-like client for the remote collections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create an entity in a collection.
    async fn create(&self, collection: Collection, body: &serde_json::Value)
        -> TransportResult<()>;

    /// Replace an existing entity.
    async fn update(
        &self,
        collection: Collection,
        id: &EntityId,
        body: &serde_json::Value,
    ) -> TransportResult<()>;

    /// Delete an existing entity.
    async fn delete(&self, collection: Collection, id: &EntityId) -> TransportResult<()>;

    /// Fetch the full contents of a collection.
    async fn list(&self, collection: Collection) -> TransportResult<Vec<serde_json::Value>>;
}

/// Send a replay request through the matching transport call.
pub async fn dispatch(transport: &dyn Transport, request: &ReplayRequest) -> TransportResult<()> {
    match request {
        ReplayRequest::Create { collection, body } => transport.create(*collection, body).await,
        ReplayRequest::Update {
            collection,
            id,
            body,
        } => transport.update(*collection, id, body).await,
        ReplayRequest::Delete { collection, id } => transport.delete(*collection, id).await,
    }
}
