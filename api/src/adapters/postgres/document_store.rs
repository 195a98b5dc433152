//! PostgreSQL adapter for DocumentStore
//!
//! One table per collection. Domain fields are stored as JSONB next to the
//! ownership columns; every statement carries the tenant predicate.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, QueryResult,
    Statement, TransactionTrait, Value,
};
use uuid::Uuid;

use crate::domain::ports::{Change, Committed, Document, DocumentStore};
use crate::domain::tenant::TenantId;
use crate::error::DomainError;

const COLUMNS: &str = "id, tenant_id, data, created_at, updated_at, version";

/// PostgreSQL implementation of DocumentStore
pub struct PostgresDocumentStore {
    db: DatabaseConnection,
}

impl PostgresDocumentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> DomainError {
    DomainError::Database(e.to_string())
}

/// Collection names are compile-time constants, but they end up inside SQL
/// text, so only plain identifiers are accepted.
fn table(collection: &'static str) -> Result<String, DomainError> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        return Err(DomainError::Internal(format!(
            "Invalid collection name: {}",
            collection
        )));
    }
    Ok(format!("\"{}\"", collection))
}

fn statement(sql: String, values: Vec<Value>) -> Statement {
    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

fn to_timestamp(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    dt.fixed_offset()
}

/// Convert a result row to a document
fn document_from_row(row: &QueryResult) -> Result<Document, DomainError> {
    let id: Uuid = row.try_get("", "id").map_err(db_err)?;
    let tenant_id: Uuid = row.try_get("", "tenant_id").map_err(db_err)?;
    let data: serde_json::Value = row.try_get("", "data").map_err(db_err)?;
    let created_at: DateTime<FixedOffset> = row.try_get("", "created_at").map_err(db_err)?;
    let updated_at: Option<DateTime<FixedOffset>> =
        row.try_get("", "updated_at").map_err(db_err)?;
    let version: i64 = row.try_get("", "version").map_err(db_err)?;

    Ok(Document {
        id,
        tenant_id: TenantId(tenant_id),
        data,
        created_at: created_at.with_timezone(&Utc),
        updated_at: updated_at.map(|dt| dt.with_timezone(&Utc)),
        version,
    })
}

async fn exists_in_tenant(
    txn: &DatabaseTransaction,
    table: &str,
    tenant: &TenantId,
    id: Uuid,
) -> Result<bool, DomainError> {
    let stmt = statement(
        format!("SELECT 1 FROM {} WHERE id = $1 AND tenant_id = $2", table),
        vec![id.into(), tenant.0.into()],
    );
    Ok(txn.query_one(stmt).await.map_err(db_err)?.is_some())
}

async fn apply(
    txn: &DatabaseTransaction,
    committed: &mut Committed,
    tenant: &TenantId,
    change: Change,
) -> Result<(), DomainError> {
    match change {
        Change::Insert {
            collection,
            document,
        } => {
            let table = table(collection)?;
            let stmt = statement(
                format!(
                    "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (id) DO NOTHING",
                    table, COLUMNS
                ),
                vec![
                    document.id.into(),
                    tenant.0.into(),
                    document.data.into(),
                    to_timestamp(document.created_at).into(),
                    document.updated_at.map(to_timestamp).into(),
                    document.version.into(),
                ],
            );
            let result = txn.execute(stmt).await.map_err(db_err)?;
            if result.rows_affected() == 0 {
                return Err(DomainError::AlreadyExists(format!(
                    "{} {} already exists",
                    collection, document.id
                )));
            }
            committed.insert(collection, document.id, document.version);
        }
        Change::Update {
            collection,
            document,
            expected_version,
        } => {
            let table = table(collection)?;
            let mut sql = format!(
                "UPDATE {} SET data = $1, updated_at = $2, version = version + 1 WHERE id = $3 AND tenant_id = $4",
                table
            );
            let mut values: Vec<Value> = vec![
                document.data.into(),
                document.updated_at.map(to_timestamp).into(),
                document.id.into(),
                tenant.0.into(),
            ];
            if let Some(expected) = expected_version {
                sql.push_str(" AND version = $5");
                values.push(expected.into());
            }
            sql.push_str(" RETURNING version");

            let Some(row) = txn.query_one(statement(sql, values)).await.map_err(db_err)? else {
                if expected_version.is_some()
                    && exists_in_tenant(txn, &table, tenant, document.id).await?
                {
                    return Err(DomainError::Conflict(format!(
                        "{} {} was modified concurrently",
                        collection, document.id
                    )));
                }
                return Err(DomainError::NotFound(format!(
                    "{} {} not found",
                    collection, document.id
                )));
            };
            let version: i64 = row.try_get("", "version").map_err(db_err)?;
            committed.insert(collection, document.id, version);
        }
        Change::Delete { collection, id } => {
            let table = table(collection)?;
            let stmt = statement(
                format!("DELETE FROM {} WHERE id = $1 AND tenant_id = $2", table),
                vec![id.into(), tenant.0.into()],
            );
            let result = txn.execute(stmt).await.map_err(db_err)?;
            if result.rows_affected() == 0 {
                return Err(DomainError::NotFound(format!(
                    "{} {} not found",
                    collection, id
                )));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn ensure_collection(&self, collection: &'static str) -> Result<(), DomainError> {
        let table = table(collection)?;

        self.db
            .execute_unprepared(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    tenant_id UUID NOT NULL,
                    data JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    updated_at TIMESTAMPTZ NULL,
                    version BIGINT NOT NULL DEFAULT 1
                )",
                table
            ))
            .await
            .map_err(db_err)?;

        self.db
            .execute_unprepared(&format!(
                "CREATE INDEX IF NOT EXISTS \"{}_tenant_idx\" ON {} (tenant_id, created_at)",
                collection, table
            ))
            .await
            .map_err(db_err)?;

        tracing::debug!(collection, "Collection table ready");
        Ok(())
    }

    async fn find(
        &self,
        collection: &'static str,
        tenant: &TenantId,
        id: Uuid,
    ) -> Result<Option<Document>, DomainError> {
        let stmt = statement(
            format!(
                "SELECT {} FROM {} WHERE id = $1 AND tenant_id = $2",
                COLUMNS,
                table(collection)?
            ),
            vec![id.into(), tenant.0.into()],
        );

        let row = self.db.query_one(stmt).await.map_err(db_err)?;
        row.as_ref().map(document_from_row).transpose()
    }

    async fn scan(
        &self,
        collection: &'static str,
        tenant: &TenantId,
    ) -> Result<Vec<Document>, DomainError> {
        let stmt = statement(
            format!(
                "SELECT {} FROM {} WHERE tenant_id = $1 ORDER BY created_at, id",
                COLUMNS,
                table(collection)?
            ),
            vec![tenant.0.into()],
        );

        let rows = self.db.query_all(stmt).await.map_err(db_err)?;
        rows.iter().map(document_from_row).collect()
    }

    async fn commit(
        &self,
        tenant: &TenantId,
        changes: Vec<Change>,
    ) -> Result<Committed, DomainError> {
        let mut committed = Committed::new();
        if changes.is_empty() {
            return Ok(committed);
        }

        // Dropping the transaction on an early return rolls it back.
        let txn = self.db.begin().await.map_err(db_err)?;
        for change in changes {
            apply(&txn, &mut committed, tenant, change).await?;
        }
        txn.commit().await.map_err(db_err)?;

        Ok(committed)
    }
}
