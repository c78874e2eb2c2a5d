//! Recovery of documents stuck without a running provider job.
//!
//! A document is orphaned when it sat in `PENDING_OCR`, or in
//! `OCR_PROCESSING` without a job id, for longer than the staleness window.
//! That happens when a process died between two state writes or a start
//! failed before the provider accepted the job.

pub mod scheduler;

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::broadcast::{publish_best_effort, tenant_channel, RealtimeNotifier, EVENT_OCR_FAILED};
use crate::db::document_repo::{self, CasOutcome, StateChange};
use crate::db::{now_timestamp, Database, DatabaseError};
use crate::document::{DocumentArtifact, ProcessingStatus};
use crate::ocr::{FailureClassification, OcrFailureCategory};
use crate::pipeline::PipelineConfig;

pub use scheduler::{ReclaimScheduler, ReclaimTask};

/// Counts from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimReport {
    pub examined: usize,
    pub reset: usize,
    pub failed: usize,
    pub lost_races: usize,
    /// Documents moved back to `PENDING_OCR`, ready for a new start.
    pub reset_ids: Vec<String>,
}

enum Reclaimed {
    Reset,
    Failed,
    LostRace,
}

pub struct OrphanReclaimer {
    db: Database,
    notifier: Arc<dyn RealtimeNotifier>,
    config: Arc<PipelineConfig>,
}

impl OrphanReclaimer {
    pub fn new(
        db: Database,
        notifier: Arc<dyn RealtimeNotifier>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            db,
            notifier,
            config,
        }
    }

    /// Resets or fails every orphan older than the staleness window.
    pub async fn reclaim_orphans(&self) -> Result<ReclaimReport, DatabaseError> {
        let stale_after = chrono::Duration::from_std(self.config.stale_after)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        let cutoff = (chrono::Utc::now() - stale_after)
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let orphans = document_repo::find_stale(&self.db, &cutoff, self.config.reclaim_batch_limit)?;
        let mut report = ReclaimReport {
            examined: orphans.len(),
            ..Default::default()
        };

        for doc in orphans {
            let span = info_span!("reclaim", document_id = %doc.id, attempt = doc.ocr_attempt_count);
            match self.reclaim_one(&doc).instrument(span).await? {
                Reclaimed::Reset => {
                    report.reset += 1;
                    report.reset_ids.push(doc.id);
                }
                Reclaimed::Failed => report.failed += 1,
                Reclaimed::LostRace => report.lost_races += 1,
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                reset = report.reset,
                failed = report.failed,
                lost_races = report.lost_races,
                "Orphan sweep finished"
            );
        } else {
            debug!("No orphaned documents");
        }
        Ok(report)
    }

    async fn reclaim_one(&self, doc: &DocumentArtifact) -> Result<Reclaimed, DatabaseError> {
        if doc.ocr_attempt_count >= self.config.max_attempts {
            return Ok(match self.fail_exhausted(doc).await? {
                CasOutcome::Applied => Reclaimed::Failed,
                CasOutcome::LostRace => Reclaimed::LostRace,
            });
        }

        let reset = StateChange::new(ProcessingStatus::PendingOcr, doc.ocr_attempt_count + 1);
        let outcome = document_repo::transition(
            &self.db,
            &doc.id,
            &doc.version(),
            &reset,
            &now_timestamp(),
        )?;
        match outcome {
            CasOutcome::Applied => {
                info!(status = %doc.processing_status, "Orphan reset to PENDING_OCR");
                Ok(Reclaimed::Reset)
            }
            CasOutcome::LostRace => Ok(Reclaimed::LostRace),
        }
    }

    async fn fail_exhausted(&self, doc: &DocumentArtifact) -> Result<CasOutcome, DatabaseError> {
        let classification = FailureClassification::new(OcrFailureCategory::ProviderTimeout);
        let change = StateChange::new(ProcessingStatus::OcrFailed, doc.ocr_attempt_count)
            .with_failure(classification.category, classification.detail.clone());
        let outcome = document_repo::transition(
            &self.db,
            &doc.id,
            &doc.version(),
            &change,
            &now_timestamp(),
        )?;

        if outcome == CasOutcome::Applied {
            warn!(
                document_id = %doc.id,
                attempts = doc.ocr_attempt_count,
                "Orphan out of attempts, marked OCR_FAILED"
            );
            publish_best_effort(
                self.notifier.as_ref(),
                &tenant_channel(&doc.tenant_id),
                EVENT_OCR_FAILED,
                json!({
                    "documentId": doc.id,
                    "category": classification.category,
                    "detail": classification.detail,
                    "hint": classification.hint,
                }),
            )
            .await;
        }
        Ok(outcome)
    }
}
