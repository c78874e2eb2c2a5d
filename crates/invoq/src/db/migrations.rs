//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order.

use rusqlite::Connection;

use super::error::DatabaseError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_documents_table",
        sql: include_str!("sql/001_create_documents.sql"),
    },
    Migration {
        version: 2,
        description: "create_suppliers_and_location_settings",
        sql: include_str!("sql/002_create_suppliers.sql"),
    },
    Migration {
        version: 3,
        description: "create_extracted_invoices_and_line_items",
        sql: include_str!("sql/003_create_extracted_invoices.sql"),
    },
    Migration {
        version: 4,
        description: "create_canonical_tables",
        sql: include_str!("sql/004_create_canonical_tables.sql"),
    },
];

/// Brings the schema up to date. Each migration commits together with its
/// `_migrations` row, so a failure leaves the previous version intact.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let applied = schema_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        log::debug!("Schema is current at v{}", applied);
        return Ok(());
    }

    for migration in pending {
        apply(conn, migration)?;
    }
    log::info!("Schema migrated from v{} to v{}", applied, schema_version(conn)?);
    Ok(())
}

/// Highest applied migration version, 0 on a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?)
}

fn apply(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    let failed = |e: rusqlite::Error| DatabaseError::Migration {
        version: migration.version,
        reason: e.to_string(),
    };

    log::info!("Applying migration v{} ({})", migration.version, migration.description);
    let tx = conn.unchecked_transaction().map_err(failed)?;
    tx.execute_batch(migration.sql).map_err(failed)?;
    tx.execute(
        "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
        rusqlite::params![migration.version, migration.description],
    )
    .map_err(failed)?;
    tx.commit().map_err(failed)
}
