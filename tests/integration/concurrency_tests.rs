//! Per-lead exclusivity of dispositions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use lead_intake::models::callback::{CallbackOffset, PendingCallback};
use lead_intake::models::disposition::DispositionAction;
use lead_intake::models::lead::Lead;
use lead_intake::models::queue::QueueSnapshot;
use lead_intake::orchestrator::disposition_manager::DispositionManager;
use lead_intake::persistence::store::{DispositionCommit, LeadStore, SqliteLeadStore, StoreFuture};
use lead_intake::policy::attempts::AttemptLimiter;
use lead_intake::queue::synchronizer::QueueSynchronizer;
use lead_intake::scheduler::callback::CallbackScheduler;
use lead_intake::DispositionError;

use super::test_helpers::{admit, harness};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pause {
    BeforeRead,
    BeforeCommit,
}

/// Store that parks one lead's request until released.
struct GatedStore {
    inner: SqliteLeadStore,
    lead_id: String,
    pause: Pause,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl GatedStore {
    fn new(inner: SqliteLeadStore, lead_id: &str, pause: Pause) -> Self {
        Self {
            inner,
            lead_id: lead_id.to_owned(),
            pause,
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    async fn gate(&self, lead_id: &str, at: Pause) {
        if lead_id == self.lead_id && at == self.pause {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

impl LeadStore for GatedStore {
    fn fetch_queue_snapshot(&self) -> StoreFuture<'_, QueueSnapshot> {
        self.inner.fetch_queue_snapshot()
    }

    fn get_lead<'a>(&'a self, lead_id: &'a str) -> StoreFuture<'a, Option<Lead>> {
        Box::pin(async move {
            self.gate(lead_id, Pause::BeforeRead).await;
            self.inner.get_lead(lead_id).await
        })
    }

    fn admit<'a>(&'a self, lead: &'a Lead) -> StoreFuture<'a, ()> {
        self.inner.admit(lead)
    }

    fn commit_disposition(&self, commit: DispositionCommit) -> StoreFuture<'_, Lead> {
        Box::pin(async move {
            self.gate(&commit.lead_id, Pause::BeforeCommit).await;
            self.inner.commit_disposition(commit).await
        })
    }

    fn due_callbacks(&self, now: DateTime<Utc>) -> StoreFuture<'_, Vec<PendingCallback>> {
        self.inner.due_callbacks(now)
    }

    fn reschedule_callback(&self, callback: PendingCallback) -> StoreFuture<'_, bool> {
        self.inner.reschedule_callback(callback)
    }

    fn readmit<'a>(&'a self, lead_id: &'a str, now: DateTime<Utc>) -> StoreFuture<'a, bool> {
        self.inner.readmit(lead_id, now)
    }
}

fn manager(store: Arc<dyn LeadStore>) -> DispositionManager {
    let sync = QueueSynchronizer::new(
        std::time::Duration::from_millis(600),
        AttemptLimiter::default(),
    )
    .into_shared();
    DispositionManager::new(store, CallbackScheduler::new(CallbackOffset::defaults()), sync)
}

#[tokio::test]
async fn second_disposition_for_same_lead_is_rejected() {
    let h = harness().await;
    let lead = admit(&h.service, "Kim").await;
    let other = admit(&h.service, "Lee").await;

    let gated = Arc::new(GatedStore::new(
        (*h.store).clone(),
        &lead.id,
        Pause::BeforeRead,
    ));
    let entered = Arc::clone(&gated.entered);
    let release = Arc::clone(&gated.release);
    let manager = manager(gated);

    let first = {
        let manager = manager.clone();
        let id = lead.id.clone();
        tokio::spawn(async move {
            manager
                .apply_disposition(&id, DispositionAction::NotAnswered)
                .await
        })
    };
    entered.notified().await;
    assert!(manager.is_in_flight(&lead.id));

    let err = manager
        .apply_disposition(&lead.id, DispositionAction::NotInterested)
        .await
        .expect_err("already in flight");
    assert!(matches!(err, DispositionError::ConcurrentModification(_)));

    // A different lead is not blocked.
    manager
        .apply_disposition(&other.id, DispositionAction::NotAnswered)
        .await
        .expect("other lead proceeds");

    release.notify_one();
    first
        .await
        .expect("task joins")
        .expect("first disposition succeeds");
    assert!(!manager.is_in_flight(&lead.id));

    let stored = h.store.leads().get_by_id(&lead.id).await.expect("query").expect("lead");
    assert_eq!(stored.attempt_count, 1, "only the first disposition applied");
    assert!(stored.is_queued());
}

#[tokio::test]
async fn abandoned_disposition_releases_claim() {
    let h = harness().await;
    let lead = admit(&h.service, "Ana").await;

    let gated = Arc::new(GatedStore::new(
        (*h.store).clone(),
        &lead.id,
        Pause::BeforeCommit,
    ));
    let entered = Arc::clone(&gated.entered);
    let manager = manager(gated);

    let task = {
        let manager = manager.clone();
        let id = lead.id.clone();
        tokio::spawn(async move {
            manager
                .apply_disposition(&id, DispositionAction::NotAnswered)
                .await
        })
    };
    entered.notified().await;
    assert!(manager.is_in_flight(&lead.id));

    task.abort();
    let _ = task.await;
    assert!(!manager.is_in_flight(&lead.id));

    let stored = h.store.leads().get_by_id(&lead.id).await.expect("query").expect("lead");
    assert_eq!(stored.attempt_count, 0, "abandoned disposition wrote nothing");
}

#[tokio::test]
async fn stale_read_from_second_instance_is_concurrent_modification() {
    let h = harness().await;
    let lead = admit(&h.service, "Eve").await;

    let gated = Arc::new(GatedStore::new(
        (*h.store).clone(),
        &lead.id,
        Pause::BeforeCommit,
    ));
    let entered = Arc::clone(&gated.entered);
    let release = Arc::clone(&gated.release);
    let slow = manager(gated);

    let task = {
        let slow = slow.clone();
        let id = lead.id.clone();
        tokio::spawn(async move { slow.apply_disposition(&id, DispositionAction::NotAnswered).await })
    };
    entered.notified().await;

    // Another process commits in between.
    h.service
        .apply_disposition(&lead.id, DispositionAction::NotAnswered)
        .await
        .expect("other instance commits");

    release.notify_one();
    let err = task
        .await
        .expect("task joins")
        .expect_err("stale attempt count");
    assert!(matches!(err, DispositionError::ConcurrentModification(_)));

    let stored = h.store.leads().get_by_id(&lead.id).await.expect("query").expect("lead");
    assert_eq!(stored.attempt_count, 1);
}
