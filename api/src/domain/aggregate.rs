//! Aggregates and stored records
//!
//! Domain types only describe their own fields. Identity, ownership and
//! timestamps live in [`Record`], which only the store session can build,
//! so no handler can assign or change the tenant of a record.

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ports::{Committed, Document};
use super::tenant::TenantId;
use crate::error::DomainError;

/// Unique identifier for an aggregate within its collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateId(pub Uuid);

impl AggregateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AggregateId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current time at the precision the database keeps (microseconds), so a
/// stamped record compares equal to the same record read back
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A persisted domain type
///
/// Every type stored through a session must implement this trait. The
/// collection name doubles as the table name and the HTTP path segment.
pub trait Aggregate: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the collection this aggregate is stored in
    const COLLECTION: &'static str;
}

/// A stored aggregate together with its ownership metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    id: AggregateId,
    tenant_id: TenantId,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    version: i64,
    data: T,
}

impl<T> Record<T> {
    pub(crate) fn new(tenant_id: TenantId, data: T) -> Self {
        Self {
            id: AggregateId::new(),
            tenant_id,
            created_at: now(),
            updated_at: None,
            version: 1,
            data,
        }
    }

    pub fn id(&self) -> AggregateId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Version of the record, starting at 1 and bumped by the store on
    /// every committed update
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    /// Stamp a pending modification
    pub(crate) fn touch(&mut self) {
        self.updated_at = Some(now());
    }
}

impl<T: Aggregate> Record<T> {
    pub(crate) fn from_document(document: Document) -> Result<Self, DomainError> {
        let data = serde_json::from_value(document.data).map_err(|e| {
            DomainError::Internal(format!(
                "Corrupt {} document {}: {}",
                T::COLLECTION,
                document.id,
                e
            ))
        })?;

        Ok(Self {
            id: AggregateId(document.id),
            tenant_id: document.tenant_id,
            created_at: document.created_at,
            updated_at: document.updated_at,
            version: document.version,
            data,
        })
    }

    /// Adopt the version the store assigned when it wrote this record
    pub fn sync_version(&mut self, committed: &Committed) {
        if let Some(version) = committed.version_of(T::COLLECTION, self.id.0) {
            self.version = version;
        }
    }

    pub(crate) fn to_document(&self) -> Result<Document, DomainError> {
        let data = serde_json::to_value(&self.data).map_err(|e| {
            DomainError::Internal(format!("Failed to serialize {}: {}", T::COLLECTION, e))
        })?;

        Ok(Document {
            id: self.id.0,
            tenant_id: self.tenant_id,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tenant::DEFAULT_TENANT_ID;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl Aggregate for Note {
        const COLLECTION: &'static str = "notes";
    }

    #[test]
    fn new_record_starts_at_version_one() {
        let record = Record::new(DEFAULT_TENANT_ID, Note { text: "hi".into() });
        assert_eq!(record.version(), 1);
        assert_eq!(record.tenant_id(), DEFAULT_TENANT_ID);
        assert!(record.updated_at().is_none());
    }

    #[test]
    fn touch_stamps_update_but_leaves_version_to_the_store() {
        let mut record = Record::new(DEFAULT_TENANT_ID, Note { text: "hi".into() });
        record.touch();
        assert_eq!(record.version(), 1);
        assert!(record.updated_at().is_some());
        assert_eq!(record.tenant_id(), DEFAULT_TENANT_ID);
    }

    #[test]
    fn sync_version_adopts_committed_version() {
        let mut record = Record::new(DEFAULT_TENANT_ID, Note { text: "hi".into() });
        let mut committed = Committed::new();
        committed.insert("notes", record.id().0, 4);
        committed.insert("other", Uuid::new_v4(), 9);

        record.sync_version(&committed);
        assert_eq!(record.version(), 4);

        record.sync_version(&Committed::new());
        assert_eq!(record.version(), 4);
    }

    #[test]
    fn timestamps_are_stamped_at_microsecond_precision() {
        use chrono::Timelike;

        let mut record = Record::new(DEFAULT_TENANT_ID, Note { text: "hi".into() });
        record.touch();
        assert_eq!(record.created_at().nanosecond() % 1_000, 0);
        assert_eq!(record.updated_at().unwrap().nanosecond() % 1_000, 0);
    }

    #[test]
    fn document_conversion_preserves_metadata() {
        let record = Record::new(DEFAULT_TENANT_ID, Note { text: "hi".into() });
        let document = record.to_document().unwrap();
        assert_eq!(document.data, serde_json::json!({ "text": "hi" }));

        let restored = Record::<Note>::from_document(document).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn corrupt_document_is_an_internal_error() {
        let mut document = Record::new(DEFAULT_TENANT_ID, Note { text: "hi".into() })
            .to_document()
            .unwrap();
        document.data = serde_json::json!({ "unexpected": 1 });

        let err = Record::<Note>::from_document(document).unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[test]
    fn aggregate_id_display() {
        let id = AggregateId(Uuid::nil());
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
    }
}
