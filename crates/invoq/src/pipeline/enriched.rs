//! Read models returned to callers.

use serde::Serialize;

use crate::canonical::LineQualitySummary;
use crate::db::invoice_repo::InvoiceRow;
use crate::document::DocumentArtifact;
use crate::ocr::{FailureClassification, OcrFailureCategory};

/// Document state plus whatever the UI needs to explain it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedStatus {
    pub document: DocumentArtifact,
    #[serde(skip)]
    pub invoice: Option<InvoiceRow>,
    pub invoice_id: Option<String>,
    pub line_quality: Option<LineQualitySummary>,
    /// Present while the document sits in `OCR_FAILED` or carries a
    /// recorded failure.
    pub failure: Option<FailureClassification>,
}

impl EnrichedStatus {
    pub fn new(
        document: DocumentArtifact,
        invoice: Option<InvoiceRow>,
        line_quality: Option<LineQualitySummary>,
    ) -> Self {
        let failure = document
            .ocr_failure_category
            .map(|category| failure_view(category, document.ocr_failure_detail.as_deref()));
        Self {
            invoice_id: invoice.as_ref().map(|i| i.id.clone()),
            document,
            invoice,
            line_quality,
            failure,
        }
    }
}

fn failure_view(category: OcrFailureCategory, detail: Option<&str>) -> FailureClassification {
    let mut view = FailureClassification::new(category);
    if let Some(detail) = detail.filter(|d| !d.is_empty()) {
        view.detail = detail.to_string();
    }
    view
}

/// What [`start_job`](super::OcrPipeline::start_job) did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started { job_id: String, attempt: u32 },
    /// Deleted, or not in a startable state.
    Skipped,
    /// Another caller moved the document first.
    LostRace,
    /// The provider refused the job; the document is now `OCR_FAILED`.
    Failed(FailureClassification),
}
