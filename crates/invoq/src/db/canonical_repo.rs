//! Canonical invoice and line rows. Always replaced as a whole set.

use rusqlite::{params, Connection, Row};

use crate::canonical::{
    CanonicalAmount, CanonicalLine, LineQualitySummary, UnitCategory, UnitInfo,
};

use super::columns::{decimal_column, decimal_text, json_column, to_json};
use super::{Database, DatabaseError};

fn amount_column(row: &Row<'_>, value: &str, display: &str) -> rusqlite::Result<CanonicalAmount> {
    Ok(CanonicalAmount {
        value: decimal_column(row, value)?,
        display: row.get(display)?,
    })
}

fn line_from_row(row: &Row<'_>) -> Result<CanonicalLine, rusqlite::Error> {
    let unit_label: Option<String> = row.get("unit_label")?;
    let unit_category: Option<UnitCategory> = row.get("unit_category")?;
    let unit = match (unit_label, unit_category) {
        (Some(label), Some(category)) => Some(UnitInfo { label, category }),
        _ => None,
    };

    Ok(CanonicalLine {
        source_line_ref: row.get("source_line_ref")?,
        raw_description: row.get("raw_description")?,
        normalized_description: row.get("normalized_description")?,
        comparison_key: row.get("comparison_key")?,
        unit,
        quantity: amount_column(row, "quantity", "quantity_display")?,
        unit_price: amount_column(row, "unit_price", "unit_price_display")?,
        line_total: amount_column(row, "line_total", "line_total_display")?,
        currency: row.get("currency")?,
        quality_status: row.get("quality_status")?,
        warn_reasons: json_column(row, "warn_reasons")?,
        adjustment_status: row.get("adjustment_status")?,
    })
}

/// Drops the invoice's canonical rows and writes `lines` in their place.
/// Returns the stored quality summary.
pub fn replace_for_invoice(
    conn: &Connection,
    invoice_id: &str,
    lines: &[CanonicalLine],
    now: &str,
) -> Result<LineQualitySummary, DatabaseError> {
    conn.execute(
        "DELETE FROM canonical_invoices WHERE invoice_id = ?1",
        params![invoice_id],
    )?;

    let summary = LineQualitySummary::from_lines(lines);
    let canonical_id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO canonical_invoices (id, invoice_id, total_lines, warn_lines, manual_edits,
         created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            canonical_id,
            invoice_id,
            summary.total_lines,
            summary.warn_lines,
            summary.manual_edits,
            now,
        ],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO canonical_line_items (id, canonical_invoice_id, position, source_line_ref,
         raw_description, normalized_description, comparison_key, unit_label, unit_category,
         quantity, quantity_display, unit_price, unit_price_display, line_total,
         line_total_display, currency, quality_status, warn_reasons, adjustment_status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
         ?18, ?19)",
    )?;
    for (position, line) in lines.iter().enumerate() {
        stmt.execute(params![
            uuid::Uuid::new_v4().to_string(),
            canonical_id,
            position as u32,
            line.source_line_ref,
            line.raw_description,
            line.normalized_description,
            line.comparison_key,
            line.unit.as_ref().map(|u| u.label.clone()),
            line.unit.as_ref().map(|u| u.category),
            decimal_text(line.quantity.value),
            line.quantity.display,
            decimal_text(line.unit_price.value),
            line.unit_price.display,
            decimal_text(line.line_total.value),
            line.line_total.display,
            line.currency,
            line.quality_status,
            to_json("warn_reasons", &line.warn_reasons)?,
            line.adjustment_status,
        ])?;
    }

    log::debug!(
        "Replaced canonical rows for invoice {}: {} lines, {} warn",
        invoice_id,
        summary.total_lines,
        summary.warn_lines
    );
    Ok(summary)
}

/// Stored quality summary, `None` when the invoice has no canonical rows.
pub fn find_summary(
    db: &Database,
    invoice_id: &str,
) -> Result<Option<LineQualitySummary>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT total_lines, warn_lines, manual_edits FROM canonical_invoices
             WHERE invoice_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![invoice_id], |row| {
            Ok(LineQualitySummary {
                total_lines: row.get("total_lines")?,
                warn_lines: row.get("warn_lines")?,
                manual_edits: row.get("manual_edits")?,
            })
        })?;
        match rows.next() {
            Some(Ok(summary)) => Ok(Some(summary)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

pub fn list_lines(db: &Database, invoice_id: &str) -> Result<Vec<CanonicalLine>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT l.* FROM canonical_line_items l
             JOIN canonical_invoices c ON c.id = l.canonical_invoice_id
             WHERE c.invoice_id = ?1
             ORDER BY l.position ASC",
        )?;
        let rows = stmt
            .query_map(params![invoice_id], line_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
