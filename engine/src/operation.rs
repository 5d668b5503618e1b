//! Operation types for expressing pending mutations.
//!
//! Changes made while offline are recorded as intents, not applied directly.
//! The store persists each intent as a [`QueuedOperation`], and a replay pass
//! turns every queued operation into one [`ReplayRequest`].

use crate::{error::Result, Collection, Error, OperationId, RetryCount, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of mutation an operation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "CREATE",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        }
    }

    /// Whether this kind addresses an existing entity by id.
    pub fn targets_existing(&self) -> bool {
        !matches!(self, OperationKind::Create)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => Ok(OperationKind::Create),
            "UPDATE" => Ok(OperationKind::Update),
            "DELETE" => Ok(OperationKind::Delete),
            _ => Err(Error::UnknownOperationKind(s.to_string())),
        }
    }
}

/// Identifier of a remote entity, taken from a payload's `id` field.
///
/// Numeric ids are kept in their decimal form so they can be placed in a
/// request path unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Name of the payload field carrying the identifier.
    pub const FIELD: &'static str = "id";

    /// Parse an identifier from a JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) if !s.is_empty() => Ok(Self(s.clone())),
            serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Self(n.to_string())),
            other => Err(Error::InvalidEntityId(other.to_string())),
        }
    }

    /// Extract the identifier from a payload, if it has one.
    ///
    /// A missing or `null` field yields `Ok(None)`; a present field with an
    /// unusable value is an error.
    pub fn extract(payload: &serde_json::Value) -> Result<Option<Self>> {
        match payload.get(Self::FIELD) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => Self::from_value(value).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated mutation that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub kind: OperationKind,
    pub collection: Collection,
    pub payload: serde_json::Value,
}

impl Intent {
    /// Validate and build an intent.
    ///
    /// The payload must be a JSON object. `UPDATE` and `DELETE` payloads must
    /// carry the target entity's id.
    pub fn new(
        kind: OperationKind,
        collection: Collection,
        payload: serde_json::Value,
    ) -> Result<Self> {
        if !payload.is_object() {
            return Err(Error::InvalidPayload(format!(
                "{kind} payload for {collection} must be a JSON object"
            )));
        }

        if kind.targets_existing() && EntityId::extract(&payload)?.is_none() {
            return Err(Error::MissingEntityId { kind, collection });
        }

        Ok(Self {
            kind,
            collection,
            payload,
        })
    }

    /// Intent to create a new entity.
    pub fn create(collection: Collection, payload: serde_json::Value) -> Result<Self> {
        Self::new(OperationKind::Create, collection, payload)
    }

    /// Intent to update an existing entity.
    pub fn update(collection: Collection, payload: serde_json::Value) -> Result<Self> {
        Self::new(OperationKind::Update, collection, payload)
    }

    /// Intent to delete an existing entity.
    pub fn delete(collection: Collection, payload: serde_json::Value) -> Result<Self> {
        Self::new(OperationKind::Delete, collection, payload)
    }
}

/// A durable record of one pending mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
    /// Store-assigned, strictly increasing, never reused
    pub id: OperationId,
    pub kind: OperationKind,
    /// Target remote collection
    pub collection: Collection,
    /// Data sent to the transport
    pub payload: serde_json::Value,
    /// Insertion time in milliseconds since epoch (diagnostics only)
    pub enqueued_at: Timestamp,
    /// Failed replay attempts so far
    pub retry_count: RetryCount,
}

impl QueuedOperation {
    /// Build the queued form of an intent once the store has assigned an id.
    pub fn from_intent(id: OperationId, intent: Intent, enqueued_at: Timestamp) -> Self {
        Self {
            id,
            kind: intent.kind,
            collection: intent.collection,
            payload: intent.payload,
            enqueued_at,
            retry_count: 0,
        }
    }

    /// Target entity id, for kinds that address an existing entity.
    pub fn entity_id(&self) -> Result<Option<EntityId>> {
        EntityId::extract(&self.payload)
    }

    /// Map this operation to the transport call that replays it.
    pub fn request(&self) -> Result<ReplayRequest> {
        let collection = self.collection;
        match self.kind {
            OperationKind::Create => Ok(ReplayRequest::Create {
                collection,
                body: self.payload.clone(),
            }),
            OperationKind::Update => Ok(ReplayRequest::Update {
                collection,
                id: self.required_id()?,
                body: self.payload.clone(),
            }),
            OperationKind::Delete => Ok(ReplayRequest::Delete {
                collection,
                id: self.required_id()?,
            }),
        }
    }

    fn required_id(&self) -> Result<EntityId> {
        self.entity_id()?.ok_or(Error::MissingEntityId {
            kind: self.kind,
            collection: self.collection,
        })
    }
}

/// A typed transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayRequest {
    Create {
        collection: Collection,
        body: serde_json::Value,
    },
    Update {
        collection: Collection,
        id: EntityId,
        body: serde_json::Value,
    },
    Delete {
        collection: Collection,
        id: EntityId,
    },
}

impl ReplayRequest {
    pub fn collection(&self) -> Collection {
        match self {
            ReplayRequest::Create { collection, .. }
            | ReplayRequest::Update { collection, .. }
            | ReplayRequest::Delete { collection, .. } => *collection,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            ReplayRequest::Create { .. } => OperationKind::Create,
            ReplayRequest::Update { .. } => OperationKind::Update,
            ReplayRequest::Delete { .. } => OperationKind::Delete,
        }
    }

    /// Request path relative to the transport's base URL.
    pub fn path(&self) -> String {
        match self {
            ReplayRequest::Create { collection, .. } => collection.path(),
            ReplayRequest::Update { collection, id, .. }
            | ReplayRequest::Delete { collection, id } => {
                format!("{}/{}", collection.path(), id)
            }
        }
    }
}
