//! Error types for the Tether engine.

use crate::{Collection, OperationKind};
use thiserror::Error;

/// All possible errors from the Tether engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Parsing errors
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("unknown operation kind: {0}")]
    UnknownOperationKind(String),

    // Payload errors
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{kind} on {collection} requires an 'id' field in the payload")]
    MissingEntityId {
        kind: OperationKind,
        collection: Collection,
    },

    #[error("invalid entity id: {0}")]
    InvalidEntityId(String),

    // Snapshot errors
    #[error("duplicate entity id '{id}' in {collection} snapshot")]
    DuplicateEntityId { collection: Collection, id: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
