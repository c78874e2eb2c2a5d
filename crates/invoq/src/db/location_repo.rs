//! Per-location feature flags.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DatabaseError};

/// Whether auto-approval is switched on. Locations without a settings row
/// are off.
pub fn is_auto_approve_enabled(
    conn: &Connection,
    location_id: &str,
) -> Result<bool, DatabaseError> {
    let enabled: Option<bool> = conn
        .query_row(
            "SELECT auto_approve_enabled FROM location_settings WHERE location_id = ?1",
            params![location_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(enabled.unwrap_or(false))
}

pub fn set_auto_approve(
    db: &Database,
    location_id: &str,
    enabled: bool,
    now: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO location_settings (location_id, auto_approve_enabled, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(location_id) DO UPDATE SET
               auto_approve_enabled = excluded.auto_approve_enabled,
               updated_at = excluded.updated_at",
            params![location_id, enabled, now],
        )?;
        Ok(())
    })
}
