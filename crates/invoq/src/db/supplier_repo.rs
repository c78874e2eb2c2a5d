//! Tenant suppliers, plus the SQLite-backed [`SupplierResolver`].

use async_trait::async_trait;
use rusqlite::{params, Connection, Row};

use crate::error::IntegrationError;
use crate::integrations::{
    normalize_supplier_name, ResolvedSupplier, SupplierResolver, SupplierStatus,
};

use super::{now_timestamp, Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierRow {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub normalized_name: String,
    pub status: SupplierStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl SupplierRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            name: row.get("name")?,
            normalized_name: row.get("normalized_name")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Returns the tenant's supplier with this name, creating it as
/// `PENDING_REVIEW` when none exists.
pub fn find_or_create(
    conn: &Connection,
    tenant_id: &str,
    name: &str,
    now: &str,
) -> Result<SupplierRow, DatabaseError> {
    let normalized = normalize_supplier_name(name);
    let created = conn.execute(
        "INSERT OR IGNORE INTO suppliers (id, tenant_id, name, normalized_name, status,
         created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            uuid::Uuid::new_v4().to_string(),
            tenant_id,
            name.trim(),
            normalized,
            SupplierStatus::PendingReview,
            now,
        ],
    )?;
    if created > 0 {
        log::info!("Created supplier '{}' for tenant {}", name.trim(), tenant_id);
    }

    let row = conn.query_row(
        "SELECT * FROM suppliers WHERE tenant_id = ?1 AND normalized_name = ?2",
        params![tenant_id, normalized],
        SupplierRow::from_row,
    )?;
    Ok(row)
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<SupplierRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM suppliers WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], SupplierRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Changes a supplier's review status. Returns false if it does not exist.
pub fn set_status(
    db: &Database,
    id: &str,
    status: SupplierStatus,
    now: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE suppliers SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status, now],
        )?;
        Ok(changed > 0)
    })
}

/// Resolves supplier names against the `suppliers` table.
#[derive(Clone)]
pub struct SqliteSupplierDirectory {
    db: Database,
}

impl SqliteSupplierDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SupplierResolver for SqliteSupplierDirectory {
    async fn resolve(
        &self,
        name: &str,
        tenant_id: &str,
    ) -> Result<ResolvedSupplier, IntegrationError> {
        if name.trim().is_empty() {
            return Err(IntegrationError::Supplier(
                "supplier name is empty".to_string(),
            ));
        }
        let now = now_timestamp();
        let row = self
            .db
            .with_conn(|conn| find_or_create(conn, tenant_id, name, &now))?;
        Ok(ResolvedSupplier {
            supplier_id: row.id,
            name: row.name,
            status: row.status,
        })
    }
}
