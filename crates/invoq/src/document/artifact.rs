//! The persisted document record.

use serde::{Deserialize, Serialize};

use crate::ocr::OcrFailureCategory;
use crate::preprocess::PreprocessFlag;

use super::status::{ProcessingStatus, ReviewStatus, VerificationSource};

/// Caller-supplied description of an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub tenant_id: String,
    pub location_id: Option<String>,
    pub filename: String,
    /// Guessed from `filename` when absent.
    pub mime_type: Option<String>,
    /// Accounting-system reference used for header overrides.
    pub external_ref: Option<String>,
}

impl DocumentMetadata {
    pub fn new(tenant_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Explicit mime type, else a guess from the file extension.
    pub fn resolved_mime_type(&self) -> Option<String> {
        match &self.mime_type {
            Some(mime) if !mime.trim().is_empty() => Some(mime.trim().to_lowercase()),
            _ => mime_guess::from_path(&self.filename)
                .first()
                .map(|m| m.essence_str().to_string()),
        }
    }
}

/// The `(status, attempt_count, job_id)` tuple every conditional write
/// compares against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVersion {
    pub status: ProcessingStatus,
    pub attempt_count: u32,
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentArtifact {
    pub id: String,
    pub tenant_id: String,
    pub location_id: Option<String>,
    pub storage_key: String,
    pub original_filename: String,
    pub mime_type: String,
    pub processing_status: ProcessingStatus,
    pub ocr_job_id: Option<String>,
    pub ocr_attempt_count: u32,
    pub ocr_failure_category: Option<OcrFailureCategory>,
    pub ocr_failure_detail: Option<String>,
    pub confidence_score: Option<f64>,
    pub preprocessing_flags: Vec<PreprocessFlag>,
    /// Derived asset submitted for the current attempt.
    pub processed_key: Option<String>,
    pub review_status: ReviewStatus,
    pub verification_source: Option<VerificationSource>,
    pub external_ref: Option<String>,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl DocumentArtifact {
    /// A fresh `PENDING_OCR` record with no attempts.
    pub fn new_pending(
        id: String,
        metadata: &DocumentMetadata,
        storage_key: String,
        mime_type: String,
        now: &str,
    ) -> Self {
        Self {
            id,
            tenant_id: metadata.tenant_id.clone(),
            location_id: metadata.location_id.clone(),
            storage_key,
            original_filename: metadata.filename.clone(),
            mime_type,
            processing_status: ProcessingStatus::PendingOcr,
            ocr_job_id: None,
            ocr_attempt_count: 0,
            ocr_failure_category: None,
            ocr_failure_detail: None,
            confidence_score: None,
            preprocessing_flags: Vec::new(),
            processed_key: None,
            review_status: ReviewStatus::None,
            verification_source: None,
            external_ref: metadata.external_ref.clone(),
            deleted_at: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    pub fn version(&self) -> StateVersion {
        StateVersion {
            status: self.processing_status,
            attempt_count: self.ocr_attempt_count,
            job_id: self.ocr_job_id.clone(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_verified(&self) -> bool {
        self.review_status == ReviewStatus::Verified
    }
}
