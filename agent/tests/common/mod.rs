//! Shared fixtures for agent integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tether_agent::config::Config;
use tether_agent::connectivity::Reachability;
use tether_agent::db::{create_memory_pool, run_migrations, Pool};
use tether_agent::queue::OperationQueue;
use tether_agent::snapshot_store::LocalSnapshotStore;
use tether_agent::transport::{Transport, TransportError, TransportResult};
use tether_agent::AppState;
use tether_engine::{Collection, EntityId, OperationKind, RetryPolicy};

/// One call observed by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub kind: OperationKind,
    pub collection: Collection,
    pub id: Option<String>,
    pub body: Option<Value>,
}

type FailWhen = Box<dyn Fn(&Call) -> bool + Send + Sync>;

/// Fake remote that records every mutation and fails the ones matching a
/// predicate with a 503.
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    fail_when: FailWhen,
    delay: Duration,
    remote: Mutex<HashMap<Collection, Vec<Value>>>,
}

impl RecordingTransport {
    pub fn accepting() -> Self {
        Self::failing_when(|_| false)
    }

    pub fn rejecting() -> Self {
        Self::failing_when(|_| true)
    }

    pub fn failing_when<F>(predicate: F) -> Self
    where
        F: Fn(&Call) -> bool + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_when: Box::new(predicate),
            delay: Duration::ZERO,
            remote: Mutex::new(HashMap::new()),
        }
    }

    /// Hold every mutation for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Serve `entities` from `list(collection)`. Unseeded collections fail.
    pub fn with_remote(self, collection: Collection, entities: Vec<Value>) -> Self {
        self.remote.lock().unwrap().insert(collection, entities);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn record(&self, call: Call) -> TransportResult<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let fail = (self.fail_when)(&call);
        self.calls.lock().unwrap().push(call);

        if fail {
            Err(TransportError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn create(&self, collection: Collection, body: &Value) -> TransportResult<()> {
        self.record(Call {
            kind: OperationKind::Create,
            collection,
            id: None,
            body: Some(body.clone()),
        })
        .await
    }

    async fn update(&self, collection: Collection, id: &EntityId, body: &Value) -> TransportResult<()> {
        self.record(Call {
            kind: OperationKind::Update,
            collection,
            id: Some(id.to_string()),
            body: Some(body.clone()),
        })
        .await
    }

    async fn delete(&self, collection: Collection, id: &EntityId) -> TransportResult<()> {
        self.record(Call {
            kind: OperationKind::Delete,
            collection,
            id: Some(id.to_string()),
            body: None,
        })
        .await
    }

    async fn list(&self, collection: Collection) -> TransportResult<Vec<Value>> {
        self.remote
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .ok_or(TransportError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
    }
}

pub async fn pool() -> Pool {
    let pool = create_memory_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

pub async fn queue_with(transport: Arc<RecordingTransport>) -> Arc<OperationQueue> {
    OperationQueue::new_shared(pool().await, transport, RetryPolicy::default())
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "REMOTE_BASE_URL" => Some("http://remote.test".to_string()),
        _ => None,
    })
    .unwrap()
}

/// State over one in-memory database shared by the queue and the cache.
pub async fn app_state(transport: Arc<RecordingTransport>) -> AppState {
    let pool = pool().await;
    AppState {
        queue: OperationQueue::new_shared(pool.clone(), transport, RetryPolicy::default()),
        snapshots: LocalSnapshotStore::new(pool),
        reachability: Reachability::new_shared(false),
        config: Arc::new(test_config()),
    }
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
