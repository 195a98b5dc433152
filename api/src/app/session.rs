//! Tenant-scoped unit of work
//!
//! A [`Session`] is opened per dispatched request. It hands out typed views
//! over the tenant's collections and buffers modifications until
//! [`Session::save_changes`] commits them in one atomic batch. Queued
//! changes are not visible to reads, in this session or any other, until
//! they are saved.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::domain::aggregate::{Aggregate, AggregateId, Record};
use crate::domain::ports::{Change, Committed, DocumentStore};
use crate::domain::tenant::{TenantContext, TenantId};
use crate::error::DomainError;

pub struct Session {
    store: Arc<dyn DocumentStore>,
    tenant: TenantContext,
    pending: Vec<Change>,
}

impl Session {
    pub fn new(store: Arc<dyn DocumentStore>, tenant: TenantContext) -> Self {
        Self {
            store,
            tenant,
            pending: Vec::new(),
        }
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant.tenant_id()
    }

    /// Create a new record owned by the session's tenant and queue its insert
    pub fn add<T: Aggregate>(&mut self, data: T) -> Result<Record<T>, DomainError> {
        let record = Record::new(self.tenant_id(), data);
        self.pending.push(Change::Insert {
            collection: T::COLLECTION,
            document: record.to_document()?,
        });
        Ok(record)
    }

    /// Load a record by ID.
    ///
    /// Records of other tenants are reported exactly like missing ones.
    pub async fn find<T: Aggregate>(&self, id: AggregateId) -> Result<Record<T>, DomainError> {
        let document = self
            .store
            .find(T::COLLECTION, &self.tenant_id(), id.0)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("{} {} not found", T::COLLECTION, id)))?;

        Record::from_document(document)
    }

    /// Start a lazy query over the tenant's records of `T`
    pub fn query<T: Aggregate>(&self) -> Query<'_, T> {
        Query {
            session: self,
            filters: Vec::new(),
            skip: 0,
            take: None,
            _marker: PhantomData,
        }
    }

    /// Stamp a modified record and queue its update.
    ///
    /// The store assigns the new version on commit; pass the result of
    /// [`save_changes`](Session::save_changes) to [`Record::sync_version`]
    /// to pick it up. With `expected_version` the commit only applies if the
    /// stored record is still at that version; without it the last write
    /// wins.
    pub fn update<T: Aggregate>(
        &mut self,
        record: &mut Record<T>,
        expected_version: Option<i64>,
    ) -> Result<(), DomainError> {
        self.ensure_owned(record)?;
        record.touch();
        self.pending.push(Change::Update {
            collection: T::COLLECTION,
            document: record.to_document()?,
            expected_version,
        });
        Ok(())
    }

    /// Queue a hard delete
    pub fn remove<T: Aggregate>(&mut self, record: Record<T>) -> Result<(), DomainError> {
        self.ensure_owned(&record)?;
        self.pending.push(Change::Delete {
            collection: T::COLLECTION,
            id: record.id().0,
        });
        Ok(())
    }

    fn ensure_owned<T: Aggregate>(&self, record: &Record<T>) -> Result<(), DomainError> {
        if record.tenant_id() != self.tenant_id() {
            return Err(DomainError::NotFound(format!(
                "{} {} not found",
                T::COLLECTION,
                record.id()
            )));
        }
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    /// Commit all queued changes atomically.
    ///
    /// Returns the versions the store assigned to every inserted or updated
    /// record.
    pub async fn save_changes(&mut self) -> Result<Committed, DomainError> {
        if self.pending.is_empty() {
            return Ok(Committed::new());
        }

        let changes = std::mem::take(&mut self.pending);
        let count = changes.len();
        let committed = self.store.commit(&self.tenant_id(), changes).await?;

        tracing::debug!(tenant = %self.tenant_id(), count, "Saved changes");
        Ok(committed)
    }

    /// Drop queued changes without writing them
    pub fn discard_changes(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}

type Predicate<'a, T> = Box<dyn Fn(&T) -> bool + Send + Sync + 'a>;

/// Lazy, restartable query over one collection.
///
/// Nothing is read until [`fetch`](Query::fetch), [`count`](Query::count) or
/// [`any`](Query::any) is awaited, and each of them reads afresh. Results are
/// ordered by creation time, then ID.
pub struct Query<'a, T> {
    session: &'a Session,
    filters: Vec<Predicate<'a, T>>,
    skip: usize,
    take: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Aggregate> Query<'a, T> {
    /// Keep only records whose data satisfies `predicate`
    pub fn filter(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'a) -> Self {
        self.filters.push(Box::new(predicate));
        self
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.skip = count;
        self
    }

    pub fn take(mut self, count: usize) -> Self {
        self.take = Some(count);
        self
    }

    pub async fn fetch(&self) -> Result<Vec<Record<T>>, DomainError> {
        let documents = self
            .session
            .store
            .scan(T::COLLECTION, &self.session.tenant_id())
            .await?;

        let mut records = Vec::new();
        let mut skipped = 0;
        for document in documents {
            if self.take.is_some_and(|take| records.len() >= take) {
                break;
            }
            let record = Record::<T>::from_document(document)?;
            if !self.filters.iter().all(|keep| keep(record.data())) {
                continue;
            }
            if skipped < self.skip {
                skipped += 1;
                continue;
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Number of records `fetch` would return
    pub async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.fetch().await?.len())
    }

    pub async fn any(&self) -> Result<bool, DomainError> {
        Ok(!self.fetch().await?.is_empty())
    }
}
