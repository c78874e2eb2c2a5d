//! Extracted invoices and their legacy line items.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;

use crate::document::VerificationSource;
use crate::ocr::RawLineItem;

use super::columns::{date_column, date_text, decimal_column, decimal_text};
use super::{Database, DatabaseError};

/// Header row in `extracted_invoices`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRow {
    pub id: String,
    pub document_id: String,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub total: Option<Decimal>,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub is_verified: bool,
    pub verification_source: Option<VerificationSource>,
    pub verified_at: Option<String>,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl InvoiceRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            document_id: row.get("document_id")?,
            invoice_number: row.get("invoice_number")?,
            invoice_date: date_column(row, "invoice_date")?,
            currency: row.get("currency")?,
            subtotal: decimal_column(row, "subtotal")?,
            tax: decimal_column(row, "tax")?,
            total: decimal_column(row, "total")?,
            supplier_id: row.get("supplier_id")?,
            supplier_name: row.get("supplier_name")?,
            is_verified: row.get("is_verified")?,
            verification_source: row.get("verification_source")?,
            verified_at: row.get("verified_at")?,
            deleted_at: row.get("deleted_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Line as extracted (or as last edited by a human). Amounts stay as the
/// raw text; parsed values live on the canonical rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemRow {
    pub id: String,
    pub invoice_id: String,
    pub position: u32,
    pub description: String,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub line_total: Option<String>,
    pub product_code: Option<String>,
    pub unit: Option<String>,
    pub currency: Option<String>,
    pub is_modified: bool,
}

impl LineItemRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            invoice_id: row.get("invoice_id")?,
            position: row.get("position")?,
            description: row.get("description")?,
            quantity: row.get("quantity")?,
            unit_price: row.get("unit_price")?,
            line_total: row.get("line_total")?,
            product_code: row.get("product_code")?,
            unit: row.get("unit")?,
            currency: row.get("currency")?,
            is_modified: row.get("is_modified")?,
        })
    }

    pub fn from_raw(
        id: String,
        invoice_id: &str,
        position: u32,
        item: &RawLineItem,
        is_modified: bool,
    ) -> Self {
        Self {
            id,
            invoice_id: invoice_id.to_string(),
            position,
            description: item.description.clone(),
            quantity: item.quantity.clone(),
            unit_price: item.unit_price.clone(),
            line_total: item.line_total.clone(),
            product_code: item.product_code.clone(),
            unit: item.unit.clone(),
            currency: item.currency.clone(),
            is_modified,
        }
    }

    pub fn to_raw(&self) -> RawLineItem {
        RawLineItem {
            description: self.description.clone(),
            quantity: self.quantity.clone(),
            unit_price: self.unit_price.clone(),
            line_total: self.line_total.clone(),
            product_code: self.product_code.clone(),
            unit: self.unit.clone(),
            currency: self.currency.clone(),
        }
    }
}

/// Soft-deletes the live invoice of a document, if any. Returns the number
/// of invoices retired.
pub fn soft_delete_live(
    conn: &Connection,
    document_id: &str,
    now: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE extracted_invoices SET deleted_at = ?2, updated_at = ?2
         WHERE document_id = ?1 AND deleted_at IS NULL",
        params![document_id, now],
    )?;
    Ok(changed)
}

pub fn insert(conn: &Connection, invoice: &InvoiceRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO extracted_invoices (id, document_id, invoice_number, invoice_date, currency,
         subtotal, tax, total, supplier_id, supplier_name, is_verified, verification_source,
         verified_at, deleted_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            invoice.id,
            invoice.document_id,
            invoice.invoice_number,
            date_text(invoice.invoice_date),
            invoice.currency,
            decimal_text(invoice.subtotal),
            decimal_text(invoice.tax),
            decimal_text(invoice.total),
            invoice.supplier_id,
            invoice.supplier_name,
            invoice.is_verified,
            invoice.verification_source,
            invoice.verified_at,
            invoice.deleted_at,
            invoice.created_at,
            invoice.updated_at,
        ],
    )?;
    Ok(())
}

/// Overwrites the editable header fields.
pub fn update_header(conn: &Connection, invoice: &InvoiceRow) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE extracted_invoices SET invoice_number = ?2, invoice_date = ?3, currency = ?4,
         subtotal = ?5, tax = ?6, total = ?7, supplier_id = ?8, supplier_name = ?9,
         updated_at = ?10
         WHERE id = ?1",
        params![
            invoice.id,
            invoice.invoice_number,
            date_text(invoice.invoice_date),
            invoice.currency,
            decimal_text(invoice.subtotal),
            decimal_text(invoice.tax),
            decimal_text(invoice.total),
            invoice.supplier_id,
            invoice.supplier_name,
            invoice.updated_at,
        ],
    )?;
    Ok(())
}

/// Marks an invoice verified. Returns false when it already was, which
/// makes repeated application a no-op.
pub fn mark_verified(
    conn: &Connection,
    invoice_id: &str,
    source: VerificationSource,
    now: &str,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE extracted_invoices SET is_verified = 1, verification_source = ?2,
         verified_at = ?3, updated_at = ?3
         WHERE id = ?1 AND is_verified = 0",
        params![invoice_id, source, now],
    )?;
    Ok(changed > 0)
}

/// Like [`mark_verified`] but also overrides an earlier verification.
/// Manual verification always wins.
pub fn force_verified(
    conn: &Connection,
    invoice_id: &str,
    source: VerificationSource,
    now: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE extracted_invoices SET is_verified = 1, verification_source = ?2,
         verified_at = ?3, updated_at = ?3
         WHERE id = ?1",
        params![invoice_id, source, now],
    )?;
    Ok(())
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<InvoiceRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM extracted_invoices WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], InvoiceRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// The one live invoice of a document.
pub fn find_live_by_document(
    db: &Database,
    document_id: &str,
) -> Result<Option<InvoiceRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM extracted_invoices WHERE document_id = ?1 AND deleted_at IS NULL",
        )?;
        let mut rows = stmt.query_map(params![document_id], InvoiceRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

pub fn insert_line_items(conn: &Connection, items: &[LineItemRow]) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO invoice_line_items (id, invoice_id, position, description, quantity,
         unit_price, line_total, product_code, unit, currency, is_modified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for item in items {
        stmt.execute(params![
            item.id,
            item.invoice_id,
            item.position,
            item.description,
            item.quantity,
            item.unit_price,
            item.line_total,
            item.product_code,
            item.unit,
            item.currency,
            item.is_modified,
        ])?;
    }
    Ok(())
}

/// Deletes every line of the invoice and inserts `items` in their place.
pub fn replace_line_items(
    conn: &Connection,
    invoice_id: &str,
    items: &[LineItemRow],
) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM invoice_line_items WHERE invoice_id = ?1",
        params![invoice_id],
    )?;
    insert_line_items(conn, items)
}

pub fn list_line_items(db: &Database, invoice_id: &str) -> Result<Vec<LineItemRow>, DatabaseError> {
    db.with_conn(|conn| list_line_items_in(conn, invoice_id))
}

pub fn list_line_items_in(
    conn: &Connection,
    invoice_id: &str,
) -> Result<Vec<LineItemRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM invoice_line_items WHERE invoice_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt
        .query_map(params![invoice_id], LineItemRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
