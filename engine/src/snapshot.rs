//! Snapshot batches for replacing local collection caches.
//!
//! A batch carries the complete server-side contents of one or more
//! collections. Applying it replaces each named collection wholesale; it is
//! never merged with what was cached before.

use crate::{error::Result, Collection, EntityId, Error};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One validated entity ready to be written to a snapshot table.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntity {
    pub id: EntityId,
    pub body: serde_json::Value,
}

/// Full-replacement contents for a set of collections.
///
/// Uses a BTreeMap so collections are always written in the same order.
/// JSON form: `{"participants": [...], "roles": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotBatch {
    collections: BTreeMap<Collection, Vec<serde_json::Value>>,
}

impl SnapshotBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`SnapshotBatch::insert`].
    pub fn with(mut self, collection: Collection, entities: Vec<serde_json::Value>) -> Self {
        self.insert(collection, entities);
        self
    }

    /// Set the full contents of a collection, replacing any earlier entry.
    pub fn insert(&mut self, collection: Collection, entities: Vec<serde_json::Value>) {
        self.collections.insert(collection, entities);
    }

    pub fn get(&self, collection: Collection) -> Option<&[serde_json::Value]> {
        self.collections.get(&collection).map(Vec::as_slice)
    }

    /// Collections present in the batch.
    pub fn collections(&self) -> impl Iterator<Item = Collection> + '_ {
        self.collections.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Total entities across all collections.
    pub fn entity_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Validate every entity and pair it with its identifier.
    ///
    /// Fails if an entity is not an object, lacks a usable `id`, or shares
    /// its id with another entity of the same collection. Nothing is
    /// returned unless the whole batch is valid.
    pub fn entities(&self) -> Result<Vec<(Collection, Vec<SnapshotEntity>)>> {
        self.collections
            .iter()
            .map(|(collection, entities)| {
                validate_collection(*collection, entities).map(|valid| (*collection, valid))
            })
            .collect()
    }
}

fn validate_collection(
    collection: Collection,
    entities: &[serde_json::Value],
) -> Result<Vec<SnapshotEntity>> {
    let mut seen = HashSet::with_capacity(entities.len());
    let mut valid = Vec::with_capacity(entities.len());

    for body in entities {
        if !body.is_object() {
            return Err(Error::InvalidPayload(format!(
                "{collection} snapshot entity must be a JSON object"
            )));
        }

        let id = EntityId::extract(body)?.ok_or_else(|| {
            Error::InvalidEntityId(format!("{collection} snapshot entity has no id"))
        })?;

        if !seen.insert(id.clone()) {
            return Err(Error::DuplicateEntityId {
                collection,
                id: id.to_string(),
            });
        }

        valid.push(SnapshotEntity {
            id,
            body: body.clone(),
        });
    }

    Ok(valid)
}
