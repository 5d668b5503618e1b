//! Integration tests for the operation queue, snapshot cache and feed.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{pool, queue_with, RecordingTransport};
use serde_json::json;
use tether_agent::feed::pull_snapshots;
use tether_agent::queue::OperationQueue;
use tether_agent::snapshot_store::LocalSnapshotStore;
use tether_engine::{Collection, OperationKind, PassReport, RetryPolicy, SnapshotBatch};

// ============================================================================
// Replay ordering and outcomes
// ============================================================================

#[tokio::test]
async fn replays_in_enqueue_order() {
    let transport = Arc::new(RecordingTransport::accepting());
    let queue = queue_with(transport.clone()).await;

    queue
        .enqueue(OperationKind::Create, Collection::Participants, json!({"id": "p-1", "name": "Ada"}))
        .await
        .unwrap();
    queue
        .enqueue(OperationKind::Update, Collection::Participants, json!({"id": "p-1", "name": "Ada L."}))
        .await
        .unwrap();
    queue
        .enqueue(OperationKind::Delete, Collection::Participants, json!({"id": "p-1"}))
        .await
        .unwrap();

    let report = queue.process_queue().await.unwrap();

    assert_eq!(report, PassReport { success: 3, failed: 0, evicted: 0 });
    let kinds: Vec<OperationKind> = transport.calls().iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![OperationKind::Create, OperationKind::Update, OperationKind::Delete]
    );
    assert_eq!(transport.calls()[1].id.as_deref(), Some("p-1"));
    assert_eq!(queue.queue_length().await, 0);
}

#[tokio::test]
async fn failure_does_not_stop_the_pass() {
    let transport = Arc::new(RecordingTransport::failing_when(|call| {
        call.collection == Collection::Venues
    }));
    let queue = queue_with(transport.clone()).await;

    queue
        .enqueue(OperationKind::Create, Collection::Roles, json!({"name": "Lead"}))
        .await
        .unwrap();
    queue
        .enqueue(OperationKind::Create, Collection::Venues, json!({"name": "Hall"}))
        .await
        .unwrap();
    queue
        .enqueue(OperationKind::Create, Collection::Activities, json!({"name": "Run"}))
        .await
        .unwrap();

    let report = queue.process_queue().await.unwrap();

    assert_eq!(report.success, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(transport.call_count(), 3);

    let pending = queue.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].collection, Collection::Venues);
    assert_eq!(pending[0].retry_count, 1);
}

#[tokio::test]
async fn evicted_after_five_failed_attempts() {
    let transport = Arc::new(RecordingTransport::rejecting());
    let queue = queue_with(transport.clone()).await;

    queue
        .enqueue(OperationKind::Update, Collection::Assignments, json!({"id": 9, "role": "x"}))
        .await
        .unwrap();

    for attempt in 1..=4u32 {
        let report = queue.process_queue().await.unwrap();
        assert_eq!(report.evicted, 0);
        assert_eq!(queue.pending().await.unwrap()[0].retry_count, attempt);
    }

    let report = queue.process_queue().await.unwrap();
    assert_eq!(report, PassReport { success: 0, failed: 1, evicted: 1 });
    assert_eq!(queue.queue_length().await, 0);
    assert_eq!(transport.call_count(), 5);

    // Nothing left to send.
    assert_eq!(queue.process_queue().await.unwrap(), PassReport::default());
    assert_eq!(transport.call_count(), 5);
}

#[tokio::test]
async fn retry_budget_follows_policy() {
    let transport = Arc::new(RecordingTransport::rejecting());
    let queue = OperationQueue::new(
        pool().await,
        transport.clone(),
        RetryPolicy::default().with_max_retries(2),
    );

    queue
        .enqueue(OperationKind::Create, Collection::Roles, json!({"name": "x"}))
        .await
        .unwrap();

    queue.process_queue().await.unwrap();
    let report = queue.process_queue().await.unwrap();

    assert_eq!(report.evicted, 1);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn operations_survive_a_reopened_queue() {
    let pool = pool().await;
    let first = OperationQueue::new(
        pool.clone(),
        Arc::new(RecordingTransport::rejecting()),
        RetryPolicy::default(),
    );
    first
        .enqueue(OperationKind::Create, Collection::Venues, json!({"name": "Hall"}))
        .await
        .unwrap();
    first.process_queue().await.unwrap();
    drop(first);

    let transport = Arc::new(RecordingTransport::accepting());
    let second = OperationQueue::new(pool, transport.clone(), RetryPolicy::default());

    let pending = second.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].retry_count, 1);

    let report = second.process_queue().await.unwrap();
    assert_eq!(report.success, 1);
    assert_eq!(transport.calls()[0].body, Some(json!({"name": "Hall"})));
}

#[tokio::test]
async fn clear_queue_discards_everything() {
    let transport = Arc::new(RecordingTransport::accepting());
    let queue = queue_with(transport.clone()).await;

    for n in 0..3 {
        queue
            .enqueue(OperationKind::Create, Collection::Roles, json!({"name": n}))
            .await
            .unwrap();
    }

    assert_eq!(queue.clear_queue().await.unwrap(), 3);
    assert_eq!(queue.queue_length().await, 0);
    assert_eq!(queue.process_queue().await.unwrap(), PassReport::default());
    assert_eq!(transport.call_count(), 0);
}

// ============================================================================
// Coalescing
// ============================================================================

#[tokio::test]
async fn overlapping_replays_coalesce() {
    let transport =
        Arc::new(RecordingTransport::accepting().with_delay(Duration::from_millis(50)));
    let queue = queue_with(transport.clone()).await;

    queue
        .enqueue(OperationKind::Create, Collection::Roles, json!({"name": "a"}))
        .await
        .unwrap();

    let driver = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.replay().await })
    };

    assert!(
        common::eventually(|| {
            let queue = queue.clone();
            async move { queue.is_replaying() }
        })
        .await
    );

    // Arrives mid-pass: handed to the running replay.
    queue
        .enqueue(OperationKind::Create, Collection::Roles, json!({"name": "b"}))
        .await
        .unwrap();
    assert_eq!(queue.replay().await.unwrap(), None);

    let total = driver.await.unwrap().unwrap().unwrap();
    assert_eq!(total.success, 2);
    assert_eq!(transport.call_count(), 2);
    assert_eq!(queue.queue_length().await, 0);
    assert!(!queue.is_replaying());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn trigger_racing_a_finishing_pass_is_not_lost() {
    let transport = Arc::new(RecordingTransport::accepting());
    let queue = queue_with(transport.clone()).await;

    for round in 0..200 {
        queue
            .enqueue(OperationKind::Create, Collection::Roles, json!({"name": round}))
            .await
            .unwrap();

        let driver = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.replay().await })
        };

        // Enqueued while the first replay may be finishing its pass.
        let late = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .enqueue(OperationKind::Create, Collection::Venues, json!({"name": round}))
                    .await
                    .unwrap();
                queue.replay().await
            })
        };

        driver.await.unwrap().unwrap();
        late.await.unwrap().unwrap();

        assert_eq!(queue.queue_length().await, 0, "round {round} left work behind");
        assert!(!queue.is_replaying());
    }

    assert_eq!(transport.call_count(), 400);
}

// ============================================================================
// Storage failures
// ============================================================================

#[tokio::test]
async fn reads_degrade_and_writes_fail_when_storage_is_gone() {
    let pool = pool().await;
    let queue = OperationQueue::new(
        pool.clone(),
        Arc::new(RecordingTransport::accepting()),
        RetryPolicy::default(),
    );
    let store = LocalSnapshotStore::new(pool.clone());

    queue
        .enqueue(OperationKind::Create, Collection::Roles, json!({"name": "x"}))
        .await
        .unwrap();
    store
        .sync_from_server(&SnapshotBatch::new().with(Collection::Roles, vec![json!({"id": "r"})]))
        .await
        .unwrap();

    pool.close().await;

    assert_eq!(queue.queue_length().await, 0);
    assert!(store.get_local_data(Collection::Roles).await.is_empty());
    assert!(queue
        .enqueue(OperationKind::Create, Collection::Roles, json!({"name": "y"}))
        .await
        .is_err());
    assert!(queue.process_queue().await.is_err());
    assert!(queue.replay().await.is_err());
    assert!(!queue.is_replaying());
}

// ============================================================================
// Snapshot cache
// ============================================================================

#[tokio::test]
async fn sync_replaces_rather_than_merges() {
    let store = LocalSnapshotStore::new(pool().await);

    let first = SnapshotBatch::new().with(
        Collection::Participants,
        vec![json!({"id": 1, "name": "Ada"}), json!({"id": 2, "name": "Grace"})],
    );
    store.sync_from_server(&first).await.unwrap();

    let second = SnapshotBatch::new().with(
        Collection::Participants,
        vec![json!({"id": 3, "name": "Edsger"})],
    );
    store.sync_from_server(&second).await.unwrap();

    let cached = store.get_local_data(Collection::Participants).await;
    assert_eq!(cached, vec![json!({"id": 3, "name": "Edsger"})]);
}

#[tokio::test]
async fn clear_cache_leaves_queue_alone() {
    let pool = pool().await;
    let store = LocalSnapshotStore::new(pool.clone());
    let queue = OperationQueue::new(
        pool,
        Arc::new(RecordingTransport::accepting()),
        RetryPolicy::default(),
    );

    store
        .sync_from_server(&SnapshotBatch::new().with(Collection::Roles, vec![json!({"id": "r"})]))
        .await
        .unwrap();
    queue
        .enqueue(OperationKind::Delete, Collection::Roles, json!({"id": "r"}))
        .await
        .unwrap();

    assert_eq!(store.clear_cache().await.unwrap(), 1);
    assert!(store.get_local_data(Collection::Roles).await.is_empty());
    assert_eq!(queue.queue_length().await, 1);
}

#[tokio::test]
async fn replay_does_not_touch_cache() {
    let pool = pool().await;
    let store = LocalSnapshotStore::new(pool.clone());
    let queue = OperationQueue::new(
        pool,
        Arc::new(RecordingTransport::accepting()),
        RetryPolicy::default(),
    );

    store
        .sync_from_server(&SnapshotBatch::new().with(Collection::Roles, vec![json!({"id": "r"})]))
        .await
        .unwrap();
    queue
        .enqueue(OperationKind::Delete, Collection::Roles, json!({"id": "r"}))
        .await
        .unwrap();
    queue.process_queue().await.unwrap();

    assert_eq!(store.get_local_data(Collection::Roles).await.len(), 1);
}

// ============================================================================
// Snapshot feed
// ============================================================================

#[tokio::test]
async fn pull_keeps_collections_that_failed_to_fetch() {
    let store = LocalSnapshotStore::new(pool().await);
    store
        .sync_from_server(
            &SnapshotBatch::new()
                .with(Collection::Roles, vec![json!({"id": "old-role"})])
                .with(Collection::Venues, vec![json!({"id": "old-venue"})]),
        )
        .await
        .unwrap();

    let transport = RecordingTransport::accepting()
        .with_remote(Collection::Roles, vec![json!({"id": "new-role"}), json!({"id": "r2"})]);

    let summary = pull_snapshots(&transport, &store, &[Collection::Roles, Collection::Venues])
        .await
        .unwrap();

    assert_eq!(summary.refreshed, vec![Collection::Roles]);
    assert_eq!(summary.failed, vec![Collection::Venues]);
    assert_eq!(summary.entities, 2);

    assert_eq!(store.count(Collection::Roles).await.unwrap(), 2);
    assert_eq!(
        store.get_local_data(Collection::Venues).await,
        vec![json!({"id": "old-venue"})]
    );
}
