//! Authoritative lead store abstraction.
//!
//! The [`LeadStore`] trait is the only way the engine reads or writes
//! persisted lead state. The store is the single writer; the queue
//! synchronizer only mirrors what it returns.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::callback::PendingCallback;
use crate::models::disposition::Effect;
use crate::models::lead::{Lead, LeadOutcome};
use crate::models::queue::QueueSnapshot;
use crate::Result;

use super::callback_repo::CallbackRepo;
use super::db::Database;
use super::lead_repo::LeadRepo;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Everything the store needs to commit one disposition atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispositionCommit {
    /// Target lead.
    pub lead_id: String,
    /// Attempt count the policy decision was based on.
    pub expected_attempts: u32,
    /// Outcome to record.
    pub outcome: LeadOutcome,
    /// Effect decided by the policy.
    pub effect: Effect,
    /// Callback to register when the effect defers re-entry.
    pub callback: Option<PendingCallback>,
    /// Commit timestamp.
    pub now: DateTime<Utc>,
}

/// Repository interface to the authoritative lead store.
pub trait LeadStore: Send + Sync {
    /// Leads currently awaiting contact, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store cannot be read.
    fn fetch_queue_snapshot(&self) -> StoreFuture<'_, QueueSnapshot>;

    /// Look up a lead regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store cannot be read.
    fn get_lead<'a>(&'a self, lead_id: &'a str) -> StoreFuture<'a, Option<Lead>>;

    /// Admit a new lead into the queue.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    fn admit<'a>(&'a self, lead: &'a Lead) -> StoreFuture<'a, ()>;

    /// Apply a disposition atomically and return the updated lead.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the lead is no longer queued, or
    /// `AppError::Disposition` with `ConcurrentModification` if its attempt
    /// count moved since `expected_attempts` was read.
    fn commit_disposition(&self, commit: DispositionCommit) -> StoreFuture<'_, Lead>;

    /// Pending callbacks due at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store cannot be read.
    fn due_callbacks(&self, now: DateTime<Utc>) -> StoreFuture<'_, Vec<PendingCallback>>;

    /// Replace the pending callback of a suspended lead. `false` if it is not suspended.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    fn reschedule_callback(&self, callback: PendingCallback) -> StoreFuture<'_, bool>;

    /// Return a suspended lead to the queue. `false` if it was not suspended.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    fn readmit<'a>(&'a self, lead_id: &'a str, now: DateTime<Utc>) -> StoreFuture<'a, bool>;
}

/// [`LeadStore`] backed by the `SQLite` repositories.
#[derive(Clone)]
pub struct SqliteLeadStore {
    leads: LeadRepo,
    callbacks: CallbackRepo,
}

impl SqliteLeadStore {
    /// Create a store over a shared pool.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            leads: LeadRepo::new(Arc::clone(&db)),
            callbacks: CallbackRepo::new(db),
        }
    }

    /// Underlying lead repository.
    #[must_use]
    pub fn leads(&self) -> &LeadRepo {
        &self.leads
    }

    /// Underlying callback repository.
    #[must_use]
    pub fn callbacks(&self) -> &CallbackRepo {
        &self.callbacks
    }
}

impl LeadStore for SqliteLeadStore {
    fn fetch_queue_snapshot(&self) -> StoreFuture<'_, QueueSnapshot> {
        Box::pin(async move {
            let leads = self.leads.list_queued().await?;
            Ok(QueueSnapshot::new(leads, Utc::now()))
        })
    }

    fn get_lead<'a>(&'a self, lead_id: &'a str) -> StoreFuture<'a, Option<Lead>> {
        Box::pin(self.leads.get_by_id(lead_id))
    }

    fn admit<'a>(&'a self, lead: &'a Lead) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.leads.create(lead).await?;
            Ok(())
        })
    }

    fn commit_disposition(&self, commit: DispositionCommit) -> StoreFuture<'_, Lead> {
        Box::pin(async move { self.leads.commit_disposition(&commit).await })
    }

    fn due_callbacks(&self, now: DateTime<Utc>) -> StoreFuture<'_, Vec<PendingCallback>> {
        Box::pin(self.callbacks.list_due(now))
    }

    fn reschedule_callback(&self, callback: PendingCallback) -> StoreFuture<'_, bool> {
        Box::pin(async move { self.callbacks.replace_for_suspended(&callback).await })
    }

    fn readmit<'a>(&'a self, lead_id: &'a str, now: DateTime<Utc>) -> StoreFuture<'a, bool> {
        Box::pin(self.leads.readmit(lead_id, now))
    }
}
