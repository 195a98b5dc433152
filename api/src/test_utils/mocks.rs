//! Document store doubles
//!
//! Wrappers around the in-memory store that record or disturb calls.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Barrier;
use uuid::Uuid;

use crate::adapters::InMemoryDocumentStore;
use crate::domain::ports::{Change, Committed, Document, DocumentStore};
use crate::domain::tenant::TenantId;
use crate::error::DomainError;

// ============================================================================
// Recording Document Store
// ============================================================================

/// Counts every backend call
#[derive(Default)]
pub struct RecordingDocumentStore {
    inner: InMemoryDocumentStore,
    finds: AtomicUsize,
    scans: AtomicUsize,
    commits: AtomicUsize,
}

impl RecordingDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_count(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Reads and commits combined
    pub fn calls(&self) -> usize {
        self.find_count() + self.scan_count() + self.commit_count()
    }
}

#[async_trait]
impl DocumentStore for RecordingDocumentStore {
    async fn ensure_collection(&self, collection: &'static str) -> Result<(), DomainError> {
        self.inner.ensure_collection(collection).await
    }

    async fn find(
        &self,
        collection: &'static str,
        tenant: &TenantId,
        id: Uuid,
    ) -> Result<Option<Document>, DomainError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find(collection, tenant, id).await
    }

    async fn scan(
        &self,
        collection: &'static str,
        tenant: &TenantId,
    ) -> Result<Vec<Document>, DomainError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.inner.scan(collection, tenant).await
    }

    async fn commit(
        &self,
        tenant: &TenantId,
        changes: Vec<Change>,
    ) -> Result<Committed, DomainError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(tenant, changes).await
    }
}

// ============================================================================
// Failing Document Store
// ============================================================================

/// Every call fails with a database error
#[derive(Default)]
pub struct FailingDocumentStore;

fn unavailable() -> DomainError {
    DomainError::Database("connection refused".to_string())
}

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn ensure_collection(&self, _collection: &'static str) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn find(
        &self,
        _collection: &'static str,
        _tenant: &TenantId,
        _id: Uuid,
    ) -> Result<Option<Document>, DomainError> {
        Err(unavailable())
    }

    async fn scan(
        &self,
        _collection: &'static str,
        _tenant: &TenantId,
    ) -> Result<Vec<Document>, DomainError> {
        Err(unavailable())
    }

    async fn commit(
        &self,
        _tenant: &TenantId,
        _changes: Vec<Change>,
    ) -> Result<Committed, DomainError> {
        Err(unavailable())
    }
}

// ============================================================================
// Gated Document Store
// ============================================================================

/// Holds the first `readers` finds until all of them have arrived, so that
/// concurrent requests are guaranteed to load the same version before any
/// of them commits.
pub struct GatedDocumentStore {
    inner: InMemoryDocumentStore,
    barrier: Barrier,
    remaining: AtomicUsize,
}

impl GatedDocumentStore {
    pub fn new(readers: usize) -> Self {
        Self {
            inner: InMemoryDocumentStore::new(),
            barrier: Barrier::new(readers),
            remaining: AtomicUsize::new(readers),
        }
    }
}

#[async_trait]
impl DocumentStore for GatedDocumentStore {
    async fn ensure_collection(&self, collection: &'static str) -> Result<(), DomainError> {
        self.inner.ensure_collection(collection).await
    }

    async fn find(
        &self,
        collection: &'static str,
        tenant: &TenantId,
        id: Uuid,
    ) -> Result<Option<Document>, DomainError> {
        let found = self.inner.find(collection, tenant, id).await?;
        let gated = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait().await;
        }
        Ok(found)
    }

    async fn scan(
        &self,
        collection: &'static str,
        tenant: &TenantId,
    ) -> Result<Vec<Document>, DomainError> {
        self.inner.scan(collection, tenant).await
    }

    async fn commit(
        &self,
        tenant: &TenantId,
        changes: Vec<Change>,
    ) -> Result<Committed, DomainError> {
        self.inner.commit(tenant, changes).await
    }
}
