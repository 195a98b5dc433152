//! Document store port
//!
//! The persistence backend behind every session. Reads and commits always
//! take the tenant; there is no way to read across tenants.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::tenant::TenantId;
use crate::error::DomainError;

/// A serialized record as the backend sees it
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i64,
}

/// A pending modification queued by a session
#[derive(Debug, Clone)]
pub enum Change {
    Insert {
        collection: &'static str,
        document: Document,
    },
    /// Replace a document's data and update stamp. The backend bumps the
    /// stored version; `document.version` is ignored. When
    /// `expected_version` is set the write only applies if the stored
    /// version still matches it.
    Update {
        collection: &'static str,
        document: Document,
        expected_version: Option<i64>,
    },
    Delete {
        collection: &'static str,
        id: Uuid,
    },
}

impl Change {
    pub fn collection(&self) -> &'static str {
        match self {
            Change::Insert { collection, .. }
            | Change::Update { collection, .. }
            | Change::Delete { collection, .. } => collection,
        }
    }
}

/// Versions the backend assigned to the documents written by one commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Committed {
    versions: HashMap<(&'static str, Uuid), i64>,
}

impl Committed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: &'static str, id: Uuid, version: i64) {
        self.versions.insert((collection, id), version);
    }

    pub fn version_of(&self, collection: &'static str, id: Uuid) -> Option<i64> {
        self.versions.get(&(collection, id)).copied()
    }
}

/// Backend for tenant-scoped document collections
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the backing storage for a collection if it does not exist
    async fn ensure_collection(&self, collection: &'static str) -> Result<(), DomainError>;

    /// Find a document by ID within a tenant
    async fn find(
        &self,
        collection: &'static str,
        tenant: &TenantId,
        id: Uuid,
    ) -> Result<Option<Document>, DomainError>;

    /// All documents of a collection within a tenant, oldest first
    async fn scan(
        &self,
        collection: &'static str,
        tenant: &TenantId,
    ) -> Result<Vec<Document>, DomainError>;

    /// Apply a batch of changes atomically: either all land or none do.
    ///
    /// Updates and deletes only match documents owned by `tenant`; a miss is
    /// reported as `NotFound`, a stale expected version as `Conflict`.
    async fn commit(
        &self,
        tenant: &TenantId,
        changes: Vec<Change>,
    ) -> Result<Committed, DomainError>;
}
