//! Document repository: inserts, lookups and conditional state writes on
//! the `documents` table.
//!
//! Every lifecycle transition goes through [`compare_and_set`], which only
//! updates the row while its `(processing_status, ocr_attempt_count,
//! ocr_job_id)` tuple still matches the version the caller read.

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, Row};

use crate::document::{
    DocumentArtifact, ProcessingStatus, ReviewStatus, StateVersion, VerificationSource,
};
use crate::ocr::OcrFailureCategory;
use crate::preprocess::PreprocessFlag;

use super::columns::{json_column, to_json};
use super::{Database, DatabaseError};

impl DocumentArtifact {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            location_id: row.get("location_id")?,
            storage_key: row.get("storage_key")?,
            original_filename: row.get("original_filename")?,
            mime_type: row.get("mime_type")?,
            processing_status: row.get("processing_status")?,
            ocr_job_id: row.get("ocr_job_id")?,
            ocr_attempt_count: row.get("ocr_attempt_count")?,
            ocr_failure_category: row.get("ocr_failure_category")?,
            ocr_failure_detail: row.get("ocr_failure_detail")?,
            confidence_score: row.get("confidence_score")?,
            preprocessing_flags: json_column(row, "preprocessing_flags")?,
            processed_key: row.get("processed_key")?,
            review_status: row.get("review_status")?,
            verification_source: row.get("verification_source")?,
            external_ref: row.get("external_ref")?,
            deleted_at: row.get("deleted_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Applied,
    /// The stored version no longer matched; nothing was written.
    LostRace,
}

impl CasOutcome {
    pub fn is_applied(self) -> bool {
        self == CasOutcome::Applied
    }
}

/// Preprocessing applied for the attempt being started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessingRecord {
    pub flags: Vec<PreprocessFlag>,
    pub processed_key: Option<String>,
}

/// The new state written by [`compare_and_set`].
///
/// The version tuple and failure fields are always written (a `None`
/// failure clears them). Preprocessing and confidence are left untouched
/// unless set.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub status: ProcessingStatus,
    pub attempt_count: u32,
    pub job_id: Option<String>,
    pub failure: Option<(OcrFailureCategory, String)>,
    pub preprocessing: Option<PreprocessingRecord>,
    pub confidence: Option<f64>,
}

impl StateChange {
    pub fn new(status: ProcessingStatus, attempt_count: u32) -> Self {
        Self {
            status,
            attempt_count,
            job_id: None,
            failure: None,
            preprocessing: None,
            confidence: None,
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_failure(mut self, category: OcrFailureCategory, detail: impl Into<String>) -> Self {
        self.failure = Some((category, detail.into()));
        self
    }

    pub fn with_preprocessing(
        mut self,
        flags: Vec<PreprocessFlag>,
        processed_key: Option<String>,
    ) -> Self {
        self.preprocessing = Some(PreprocessingRecord {
            flags,
            processed_key,
        });
        self
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Inserts a new document row.
pub fn insert(db: &Database, doc: &DocumentArtifact) -> Result<(), DatabaseError> {
    let flags = to_json("preprocessing_flags", &doc.preprocessing_flags)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO documents (id, tenant_id, location_id, storage_key, original_filename,
             mime_type, processing_status, ocr_job_id, ocr_attempt_count, ocr_failure_category,
             ocr_failure_detail, confidence_score, preprocessing_flags, processed_key,
             review_status, verification_source, external_ref, deleted_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
             ?18, ?19, ?20)",
            params![
                doc.id,
                doc.tenant_id,
                doc.location_id,
                doc.storage_key,
                doc.original_filename,
                doc.mime_type,
                doc.processing_status,
                doc.ocr_job_id,
                doc.ocr_attempt_count,
                doc.ocr_failure_category,
                doc.ocr_failure_detail,
                doc.confidence_score,
                flags,
                doc.processed_key,
                doc.review_status,
                doc.verification_source,
                doc.external_ref,
                doc.deleted_at,
                doc.created_at,
                doc.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a document by its ID, deleted or not.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<DocumentArtifact>, DatabaseError> {
    db.with_conn(|conn| find_by_id_in(conn, id))
}

pub fn find_by_id_in(
    conn: &Connection,
    id: &str,
) -> Result<Option<DocumentArtifact>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], DocumentArtifact::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

/// Finds the live document currently carrying a provider job id.
pub fn find_by_job_id(
    db: &Database,
    job_id: &str,
) -> Result<Option<DocumentArtifact>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE ocr_job_id = ?1 AND deleted_at IS NULL LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![job_id], DocumentArtifact::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Live documents last touched before `cutoff` that are pending, or
/// processing without a provider job id. Oldest first.
pub fn find_stale(
    db: &Database,
    cutoff: &str,
    limit: u32,
) -> Result<Vec<DocumentArtifact>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents
             WHERE deleted_at IS NULL
               AND updated_at < ?1
               AND (processing_status = ?2
                    OR (processing_status = ?3 AND ocr_job_id IS NULL))
             ORDER BY updated_at ASC
             LIMIT ?4",
        )?;
        let rows = stmt
            .query_map(
                params![
                    cutoff,
                    ProcessingStatus::PendingOcr,
                    ProcessingStatus::OcrProcessing,
                    limit
                ],
                DocumentArtifact::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Writes `change` only if the row still matches `expected` and is not
/// soft-deleted.
pub fn compare_and_set(
    conn: &Connection,
    id: &str,
    expected: &StateVersion,
    change: &StateChange,
    now: &str,
) -> Result<CasOutcome, DatabaseError> {
    let (failure_category, failure_detail) = match &change.failure {
        Some((category, detail)) => (Some(*category), Some(detail.clone())),
        None => (None, None),
    };

    let mut sets = vec![
        "processing_status = ?1".to_string(),
        "ocr_attempt_count = ?2".to_string(),
        "ocr_job_id = ?3".to_string(),
        "ocr_failure_category = ?4".to_string(),
        "ocr_failure_detail = ?5".to_string(),
        "updated_at = ?6".to_string(),
    ];
    let mut param_values: Vec<Box<dyn ToSql>> = vec![
        Box::new(change.status),
        Box::new(change.attempt_count),
        Box::new(change.job_id.clone()),
        Box::new(failure_category),
        Box::new(failure_detail),
        Box::new(now.to_string()),
    ];

    if let Some(ref record) = change.preprocessing {
        sets.push(format!("preprocessing_flags = ?{}", param_values.len() + 1));
        param_values.push(Box::new(to_json("preprocessing_flags", &record.flags)?));
        sets.push(format!("processed_key = ?{}", param_values.len() + 1));
        param_values.push(Box::new(record.processed_key.clone()));
    }
    if let Some(confidence) = change.confidence {
        sets.push(format!("confidence_score = ?{}", param_values.len() + 1));
        param_values.push(Box::new(confidence));
    }

    let first_condition = param_values.len() + 1;
    param_values.push(Box::new(id.to_string()));
    param_values.push(Box::new(expected.status));
    param_values.push(Box::new(expected.attempt_count));
    param_values.push(Box::new(expected.job_id.clone()));

    let sql = format!(
        "UPDATE documents SET {} WHERE id = ?{} AND processing_status = ?{}
         AND ocr_attempt_count = ?{} AND ocr_job_id IS ?{} AND deleted_at IS NULL",
        sets.join(", "),
        first_condition,
        first_condition + 1,
        first_condition + 2,
        first_condition + 3,
    );

    let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();
    let changed = conn.execute(&sql, params_ref.as_slice())?;

    if changed == 0 {
        log::debug!(
            "Conditional write on document {} lost the race (expected {} attempt {})",
            id,
            expected.status,
            expected.attempt_count
        );
        return Ok(CasOutcome::LostRace);
    }
    Ok(CasOutcome::Applied)
}

/// [`compare_and_set`] outside a caller-managed transaction.
pub fn transition(
    db: &Database,
    id: &str,
    expected: &StateVersion,
    change: &StateChange,
    now: &str,
) -> Result<CasOutcome, DatabaseError> {
    db.with_conn(|conn| compare_and_set(conn, id, expected, change, now))
}

/// Sets review fields. Does not touch the version tuple.
pub fn set_review(
    conn: &Connection,
    id: &str,
    review_status: ReviewStatus,
    source: Option<VerificationSource>,
    now: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE documents SET review_status = ?2, verification_source = ?3, updated_at = ?4
         WHERE id = ?1",
        params![id, review_status, source, now],
    )?;
    Ok(())
}

/// Marks a live document deleted. Returns false if it was already deleted
/// or does not exist.
pub fn soft_delete(db: &Database, id: &str, now: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET deleted_at = ?2, updated_at = ?2
             WHERE id = ?1 AND deleted_at IS NULL",
            params![id, now],
        )?;
        Ok(changed > 0)
    })
}

/// Clears the deletion marker. Returns false if the document was not deleted.
pub fn restore(db: &Database, id: &str, now: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET deleted_at = NULL, updated_at = ?2
             WHERE id = ?1 AND deleted_at IS NOT NULL",
            params![id, now],
        )?;
        Ok(changed > 0)
    })
}
