//! In-memory adapter for DocumentStore
//!
//! Used when no database is configured and as the backing store in tests.
//! Commits are applied to a copy of the data and swapped in only if every
//! change succeeds.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{Change, Committed, Document, DocumentStore};
use crate::domain::tenant::TenantId;
use crate::error::DomainError;

type Collections = HashMap<&'static str, HashMap<Uuid, Document>>;

/// In-memory implementation of DocumentStore
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E>(_: E) -> DomainError {
    DomainError::Internal("In-memory store lock poisoned".to_string())
}

/// Apply one change to the working copy
fn apply(
    working: &mut Collections,
    committed: &mut Committed,
    tenant: &TenantId,
    change: Change,
) -> Result<(), DomainError> {
    match change {
        Change::Insert {
            collection,
            document,
        } => {
            let docs = working.entry(collection).or_default();
            if docs.contains_key(&document.id) {
                return Err(DomainError::AlreadyExists(format!(
                    "{} {} already exists",
                    collection, document.id
                )));
            }
            committed.insert(collection, document.id, document.version);
            docs.insert(document.id, document);
        }
        Change::Update {
            collection,
            document,
            expected_version,
        } => {
            let stored = working
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(&document.id))
                .filter(|stored| stored.tenant_id == *tenant)
                .ok_or_else(|| {
                    DomainError::NotFound(format!("{} {} not found", collection, document.id))
                })?;

            if let Some(expected) = expected_version {
                if stored.version != expected {
                    return Err(DomainError::Conflict(format!(
                        "{} {} was modified (expected version {}, found {})",
                        collection, document.id, expected, stored.version
                    )));
                }
            }

            // Ownership and creation stamp are never rewritten.
            stored.data = document.data;
            stored.updated_at = document.updated_at;
            stored.version += 1;
            committed.insert(collection, document.id, stored.version);
        }
        Change::Delete { collection, id } => {
            let docs = working.get_mut(collection);
            let owned = docs
                .as_ref()
                .and_then(|docs| docs.get(&id))
                .is_some_and(|stored| stored.tenant_id == *tenant);
            match docs {
                Some(docs) if owned => {
                    docs.remove(&id);
                }
                _ => {
                    return Err(DomainError::NotFound(format!(
                        "{} {} not found",
                        collection, id
                    )))
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_collection(&self, collection: &'static str) -> Result<(), DomainError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections.entry(collection).or_default();
        Ok(())
    }

    async fn find(
        &self,
        collection: &'static str,
        tenant: &TenantId,
        id: Uuid,
    ) -> Result<Option<Document>, DomainError> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .filter(|doc| doc.tenant_id == *tenant)
            .cloned())
    }

    async fn scan(
        &self,
        collection: &'static str,
        tenant: &TenantId,
    ) -> Result<Vec<Document>, DomainError> {
        let collections = self.collections.read().map_err(poisoned)?;
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| doc.tenant_id == *tenant)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        docs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(docs)
    }

    async fn commit(
        &self,
        tenant: &TenantId,
        changes: Vec<Change>,
    ) -> Result<Committed, DomainError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let mut working = collections.clone();
        let mut committed = Committed::new();
        for change in changes {
            apply(&mut working, &mut committed, tenant, change)?;
        }
        *collections = working;
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn tenant_a() -> TenantId {
        TenantId(Uuid::from_u128(1))
    }

    fn tenant_b() -> TenantId {
        TenantId(Uuid::from_u128(2))
    }

    fn doc(tenant: TenantId, name: &str) -> Document {
        Document {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            data: json!({ "name": name }),
            created_at: Utc::now(),
            updated_at: None,
            version: 1,
        }
    }

    fn insert(document: Document) -> Change {
        Change::Insert {
            collection: "notes",
            document,
        }
    }

    #[tokio::test]
    async fn find_is_scoped_to_tenant() {
        let store = InMemoryDocumentStore::new();
        let document = doc(tenant_a(), "a");
        let id = document.id;
        store.commit(&tenant_a(), vec![insert(document)]).await.unwrap();

        assert!(store.find("notes", &tenant_a(), id).await.unwrap().is_some());
        assert!(store.find("notes", &tenant_b(), id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scan_is_scoped_to_tenant_and_ordered() {
        let store = InMemoryDocumentStore::new();
        let first = doc(tenant_a(), "first");
        let mut second = doc(tenant_a(), "second");
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        let other = doc(tenant_b(), "other");

        store
            .commit(&tenant_a(), vec![insert(second), insert(first)])
            .await
            .unwrap();
        store.commit(&tenant_b(), vec![insert(other)]).await.unwrap();

        let docs = store.scan("notes", &tenant_a()).await.unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.data["name"].clone()).collect();
        assert_eq!(names, vec![json!("first"), json!("second")]);
    }

    #[tokio::test]
    async fn scan_of_unknown_collection_is_empty() {
        let store = InMemoryDocumentStore::new();
        assert!(store.scan("nothing", &tenant_a()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_of_foreign_document_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let document = doc(tenant_a(), "a");
        store
            .commit(&tenant_a(), vec![insert(document.clone())])
            .await
            .unwrap();

        let mut changed = document.clone();
        changed.data = json!({ "name": "hijacked" });
        let err = store
            .commit(
                &tenant_b(),
                vec![Change::Update {
                    collection: "notes",
                    document: changed,
                    expected_version: None,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        let stored = store
            .find("notes", &tenant_a(), document.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.data, json!({ "name": "a" }));
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let store = InMemoryDocumentStore::new();
        let document = doc(tenant_a(), "a");
        store
            .commit(&tenant_a(), vec![insert(document.clone())])
            .await
            .unwrap();

        let mut changed = document.clone();
        changed.version = 3;
        let err = store
            .commit(
                &tenant_a(),
                vec![Change::Update {
                    collection: "notes",
                    document: changed,
                    expected_version: Some(2),
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn updates_from_the_same_read_get_distinct_versions() {
        let store = InMemoryDocumentStore::new();
        let document = doc(tenant_a(), "a");
        store
            .commit(&tenant_a(), vec![insert(document.clone())])
            .await
            .unwrap();

        let mut versions = Vec::new();
        for name in ["first", "second"] {
            let mut changed = document.clone();
            changed.data = json!({ "name": name });
            let committed = store
                .commit(
                    &tenant_a(),
                    vec![Change::Update {
                        collection: "notes",
                        document: changed,
                        expected_version: None,
                    }],
                )
                .await
                .unwrap();
            versions.push(committed.version_of("notes", document.id));
        }

        assert_eq!(versions, vec![Some(2), Some(3)]);
        let stored = store
            .find("notes", &tenant_a(), document.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 3);
    }

    #[tokio::test]
    async fn delete_of_foreign_document_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let document = doc(tenant_a(), "a");
        let id = document.id;
        store.commit(&tenant_a(), vec![insert(document)]).await.unwrap();

        let err = store
            .commit(
                &tenant_b(),
                vec![Change::Delete {
                    collection: "notes",
                    id,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert!(store.find("notes", &tenant_a(), id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_commit_applies_nothing() {
        let store = InMemoryDocumentStore::new();
        let fresh = doc(tenant_a(), "fresh");
        let fresh_id = fresh.id;

        let err = store
            .commit(
                &tenant_a(),
                vec![
                    insert(fresh),
                    Change::Delete {
                        collection: "notes",
                        id: Uuid::new_v4(),
                    },
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound(_)));
        assert!(store
            .find("notes", &tenant_a(), fresh_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let document = doc(tenant_a(), "a");
        store
            .commit(&tenant_a(), vec![insert(document.clone())])
            .await
            .unwrap();

        let err = store
            .commit(&tenant_a(), vec![insert(document)])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists(_)));
    }
}
