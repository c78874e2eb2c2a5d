use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::approval::{self, ApprovalInput, AutoApprovalDecision, IneligibleReason};
use crate::broadcast::{
    publish_best_effort, tenant_channel, BroadcastNotifier, RealtimeNotifier, EVENT_OCR_COMPLETED,
    EVENT_OCR_FAILED,
};
use crate::canonical::{CanonicalLine, Canonicalizer, LineInput, SourceLineRef};
use crate::config::Config;
use crate::db::document_repo::{self, CasOutcome, StateChange};
use crate::db::invoice_repo::{self, InvoiceRow, LineItemRow};
use crate::db::supplier_repo::SqliteSupplierDirectory;
use crate::db::{
    canonical_repo, default_database_path, location_repo, now_timestamp, Database, DatabaseError,
};
use crate::document::{
    DocumentArtifact, DocumentMetadata, ProcessingStatus, ReviewStatus, StateVersion,
    VerificationSource,
};
use crate::error::{ConfigError, InvoqError};
use crate::integrations::{
    AccountingOverrideLookup, NoAccountingOverrides, ResolvedSupplier, SupplierResolver,
};
use crate::ocr::{
    classify, ExtractedHeader, FailureClassification, HttpOcrProvider, OcrDocument,
    OcrFailureCategory, OcrJobRequest, OcrJobResult, OcrProvider,
};
use crate::parsing::{parse_amount, FieldKind};
use crate::preprocess::{
    is_image, ImageTransformer, PreparedAsset, PreprocessingController, RasterTransformer,
};
use crate::quality::Dictionary;
use crate::reclaimer::{OrphanReclaimer, ReclaimReport};
use crate::sanitize;
use crate::storage::{original_key, BlobStore, FileBlobStore};

use super::config::PipelineConfig;
use super::edits::VerificationEdits;
use super::enriched::{EnrichedStatus, StartOutcome};
use super::error::PipelineError;

/// External services the pipeline talks to.
pub struct Collaborators {
    pub blobs: Arc<dyn BlobStore>,
    pub provider: Arc<dyn OcrProvider>,
    pub transformer: Arc<dyn ImageTransformer>,
    pub suppliers: Arc<dyn SupplierResolver>,
    pub accounting: Arc<dyn AccountingOverrideLookup>,
    pub notifier: Arc<dyn RealtimeNotifier>,
    pub dictionary: Arc<Dictionary>,
}

/// Drives documents through OCR, canonicalization and auto-approval.
///
/// Every state change is a conditional write against the version the
/// caller read, so any number of pollers, sweeps and webhook retries may
/// work on the same document at once.
pub struct OcrPipeline {
    config: Arc<PipelineConfig>,
    db: Database,
    blobs: Arc<dyn BlobStore>,
    provider: Arc<dyn OcrProvider>,
    preprocessor: PreprocessingController,
    canonicalizer: Canonicalizer,
    suppliers: Arc<dyn SupplierResolver>,
    accounting: Arc<dyn AccountingOverrideLookup>,
    notifier: Arc<dyn RealtimeNotifier>,
    reclaimer: OrphanReclaimer,
}

impl OcrPipeline {
    pub fn new(config: PipelineConfig, db: Database, collaborators: Collaborators) -> Self {
        let config = Arc::new(config);
        let preprocessor = PreprocessingController::new(
            Arc::clone(&collaborators.blobs),
            collaborators.transformer,
            config.preprocessing.clone(),
        );
        let reclaimer = OrphanReclaimer::new(
            db.clone(),
            Arc::clone(&collaborators.notifier),
            Arc::clone(&config),
        );

        Self {
            config,
            db,
            blobs: collaborators.blobs,
            provider: collaborators.provider,
            preprocessor,
            canonicalizer: Canonicalizer::new(collaborators.dictionary),
            suppliers: collaborators.suppliers,
            accounting: collaborators.accounting,
            notifier: collaborators.notifier,
            reclaimer,
        }
    }

    /// Production constructor: SQLite database, file blob store, HTTP OCR
    /// provider and an in-process broadcast notifier, returned so callers
    /// can subscribe.
    pub fn from_config(config: &Config) -> Result<(Self, BroadcastNotifier), InvoqError> {
        let db_path = match &config.database_path {
            Some(path) => PathBuf::from(path),
            None => default_database_path().ok_or_else(|| ConfigError::Validation {
                message: "database_path is not set and no home directory was found".to_string(),
            })?,
        };
        let endpoint = config
            .ocr
            .endpoint
            .as_deref()
            .ok_or_else(|| ConfigError::Validation {
                message: "ocr.endpoint is required".to_string(),
            })?;

        let db = Database::open(&db_path)?;
        let notifier = BroadcastNotifier::new(config.notifications.capacity);
        let dictionary =
            Dictionary::load_or_disabled(config.quality.dictionary_path.as_deref().map(Path::new));

        let collaborators = Collaborators {
            blobs: Arc::new(FileBlobStore::new(&config.blob_directory)),
            provider: Arc::new(HttpOcrProvider::new(endpoint)),
            transformer: Arc::new(RasterTransformer::new()),
            suppliers: Arc::new(SqliteSupplierDirectory::new(db.clone())),
            accounting: Arc::new(NoAccountingOverrides),
            notifier: Arc::new(notifier.clone()),
            dictionary: Arc::new(dictionary),
        };

        Ok((
            Self::new(PipelineConfig::from_config(config), db, collaborators),
            notifier,
        ))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Stores an upload, records it as `PENDING_OCR` and starts the first
    /// attempt. A failed start leaves the document to the reclaimer.
    pub async fn submit(
        &self,
        metadata: DocumentMetadata,
        bytes: Vec<u8>,
    ) -> Result<DocumentArtifact, PipelineError> {
        if metadata.tenant_id.trim().is_empty() {
            return Err(PipelineError::Validation("tenant id is required".to_string()));
        }
        if bytes.is_empty() {
            return Err(PipelineError::Validation(format!(
                "upload '{}' is empty",
                metadata.filename
            )));
        }
        let mime_type = metadata.resolved_mime_type().ok_or_else(|| {
            PipelineError::Validation(format!(
                "cannot determine the type of '{}'",
                metadata.filename
            ))
        })?;
        if mime_type != "application/pdf" && !is_image(&mime_type) {
            return Err(PipelineError::Validation(format!(
                "unsupported file type '{}'",
                mime_type
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let key = original_key(&metadata.tenant_id, &id, &metadata.filename);
        let stored_key = self.blobs.put(&key, bytes, &mime_type).await?;

        let doc =
            DocumentArtifact::new_pending(id, &metadata, stored_key, mime_type, &now_timestamp());
        document_repo::insert(&self.db, &doc)?;
        info!(
            document_id = %doc.id,
            key = %sanitize::redact_key(&doc.storage_key),
            "Document submitted"
        );

        if let Err(e) = self.start_job(&doc.id).await {
            warn!(document_id = %doc.id, "Initial OCR start failed, leaving for reclaim: {}", e);
        }

        Ok(document_repo::find_by_id(&self.db, &doc.id)?.unwrap_or(doc))
    }

    /// Starts the next OCR attempt for a pending or failed document.
    pub async fn start_job(&self, document_id: &str) -> Result<StartOutcome, PipelineError> {
        let span = info_span!("start_job", document_id);
        self.start_job_inner(document_id).instrument(span).await
    }

    async fn start_job_inner(&self, document_id: &str) -> Result<StartOutcome, PipelineError> {
        let doc = self
            .load(document_id)
            .inspect_err(|e| error!("Cannot start OCR: {}", e))?;
        if doc.is_deleted() {
            debug!("Document is deleted, not starting");
            return Ok(StartOutcome::Skipped);
        }
        if !doc.processing_status.can_start() {
            debug!(status = %doc.processing_status, "Document is not startable");
            return Ok(StartOutcome::Skipped);
        }

        let next_attempt = doc.ocr_attempt_count + 1;
        if next_attempt > self.config.max_attempts {
            error!(
                attempts = doc.ocr_attempt_count,
                max = self.config.max_attempts,
                "OCR attempts exhausted"
            );
            return Err(PipelineError::AttemptsExhausted {
                attempts: doc.ocr_attempt_count,
                max: self.config.max_attempts,
            });
        }

        let asset = match self
            .preprocessor
            .prepare(&doc.storage_key, &doc.mime_type, next_attempt)
            .await
        {
            Ok(asset) => asset,
            Err(e) => {
                warn!(attempt = next_attempt, "Preprocessing failed, submitting original: {}", e);
                PreparedAsset::original(&doc.storage_key, &doc.mime_type)
            }
        };

        let processed_key = (asset.key != doc.storage_key).then(|| asset.key.clone());
        let to_processing = StateChange::new(ProcessingStatus::OcrProcessing, next_attempt)
            .with_preprocessing(asset.flags.clone(), processed_key);
        let outcome = document_repo::transition(
            &self.db,
            &doc.id,
            &doc.version(),
            &to_processing,
            &now_timestamp(),
        )
        .inspect_err(|e| error!("Cannot record OCR_PROCESSING: {}", e))?;
        if outcome == CasOutcome::LostRace {
            debug!("Lost the race moving to OCR_PROCESSING");
            return Ok(StartOutcome::LostRace);
        }

        // From here on failures are recorded on the document.
        let processing = StateVersion {
            status: ProcessingStatus::OcrProcessing,
            attempt_count: next_attempt,
            job_id: None,
        };
        let request = OcrJobRequest {
            key: asset.key,
            mime_type: asset.mime_type,
            native_deskew: asset.native_deskew,
        };

        match self.provider.start_job(&request).await {
            Ok(job_id) => {
                let attach = StateChange::new(ProcessingStatus::OcrProcessing, next_attempt)
                    .with_job_id(job_id.clone());
                let outcome = document_repo::transition(
                    &self.db,
                    &doc.id,
                    &processing,
                    &attach,
                    &now_timestamp(),
                )?;
                if outcome == CasOutcome::LostRace {
                    debug!(%job_id, "Lost the race attaching the job id");
                    return Ok(StartOutcome::LostRace);
                }
                info!(%job_id, attempt = next_attempt, flags = ?asset.flags, "OCR job started");
                Ok(StartOutcome::Started {
                    job_id,
                    attempt: next_attempt,
                })
            }
            Err(e) => {
                let classification = classify(Some(&e.to_failure()), None, None);
                warn!(category = %classification.category, "OCR provider refused the job: {}", e);
                match self.fail(&doc, &processing, &classification, None).await? {
                    CasOutcome::Applied => Ok(StartOutcome::Failed(classification)),
                    CasOutcome::LostRace => Ok(StartOutcome::LostRace),
                }
            }
        }
    }

    /// Checks the provider job and applies its result. Documents without a
    /// running job are returned as stored. Safe to call repeatedly.
    pub async fn poll(&self, document_id: &str) -> Result<EnrichedStatus, PipelineError> {
        let span = info_span!("poll", document_id);
        self.poll_inner(document_id).instrument(span).await
    }

    async fn poll_inner(&self, document_id: &str) -> Result<EnrichedStatus, PipelineError> {
        let doc = self.load(document_id)?;
        let running_job = doc
            .ocr_job_id
            .clone()
            .filter(|_| doc.processing_status == ProcessingStatus::OcrProcessing)
            .filter(|_| !doc.is_deleted());
        let Some(job_id) = running_job else {
            return self.enrich(doc);
        };

        let result = match self.provider.get_job_result(&job_id).await {
            Ok(result) => result,
            Err(e) => {
                warn!(%job_id, "Polling the OCR provider failed: {}", e);
                return self.enrich(doc);
            }
        };

        match result {
            OcrJobResult::InProgress => {
                debug!(%job_id, "OCR job still running");
                return self.enrich(doc);
            }
            OcrJobResult::Failed {
                error,
                confidence,
                word_count,
            } => {
                let classification = classify(error.as_ref(), confidence, word_count);
                warn!(%job_id, category = %classification.category, "OCR job failed");
                self.fail(&doc, &doc.version(), &classification, confidence)
                    .await?;
            }
            OcrJobResult::Succeeded(payload) => {
                self.complete(&doc, payload).await?;
            }
        }

        let current = self.load(document_id)?;
        self.enrich(current)
    }

    async fn complete(
        &self,
        doc: &DocumentArtifact,
        payload: OcrDocument,
    ) -> Result<(), PipelineError> {
        if payload.word_count < self.config.early_abort_min_words
            || payload.confidence < self.config.early_abort_min_confidence
        {
            info!(
                word_count = payload.word_count,
                confidence = payload.confidence,
                "Too little text for an invoice"
            );
            let classification = FailureClassification::new(OcrFailureCategory::NotADocument);
            self.fail(doc, &doc.version(), &classification, Some(payload.confidence))
                .await?;
            return Ok(());
        }

        let header = self.apply_header_override(doc, payload.header).await;
        let supplier = self.resolve_supplier(doc, &header).await;
        let lines = self
            .canonicalizer
            .canonicalize_ocr_lines(&payload.line_items, header.currency.as_deref());

        let now = now_timestamp();
        let expected = doc.version();
        let to_complete = StateChange::new(ProcessingStatus::OcrComplete, doc.ocr_attempt_count)
            .with_confidence(Some(payload.confidence));

        let committed = self.db.transaction(|tx| {
            // The guard is the first write: a lost race has nothing to undo.
            let outcome = document_repo::compare_and_set(tx, &doc.id, &expected, &to_complete, &now)?;
            if outcome == CasOutcome::LostRace {
                return Ok::<_, PipelineError>(None);
            }

            invoice_repo::soft_delete_live(tx, &doc.id, &now)?;
            let invoice = invoice_from_header(&doc.id, &header, supplier.as_ref(), &now);
            invoice_repo::insert(tx, &invoice)?;

            let legacy: Vec<LineItemRow> = payload
                .line_items
                .iter()
                .enumerate()
                .map(|(position, item)| {
                    LineItemRow::from_raw(
                        uuid::Uuid::new_v4().to_string(),
                        &invoice.id,
                        position as u32,
                        item,
                        false,
                    )
                })
                .collect();
            invoice_repo::insert_line_items(tx, &legacy)?;
            let summary = canonical_repo::replace_for_invoice(tx, &invoice.id, &lines, &now)?;

            let auto_approve_enabled = match doc.location_id.as_deref() {
                Some(location_id) => location_repo::is_auto_approve_enabled(tx, location_id)?,
                None => false,
            };
            let input = ApprovalInput {
                auto_approve_enabled,
                already_verified: doc.is_verified() || invoice.is_verified,
                has_manual_edits: false,
                supplier_status: supplier.as_ref().map(|s| s.status),
                line_quality: Some(summary),
                confidence: Some(payload.confidence),
                total: invoice.total,
                total_unreadable: invoice.total.is_none() && has_text(header.total.as_deref()),
            };
            let decision = approval::evaluate(&input, self.config.min_approval_confidence);
            apply_decision(tx, &doc.id, &invoice.id, &decision, &now)?;

            Ok(Some((invoice.id, decision, summary)))
        })?;

        let Some((invoice_id, decision, summary)) = committed else {
            debug!("Lost the race completing the document");
            return Ok(());
        };

        let reason = match decision {
            AutoApprovalDecision::Eligible => None,
            AutoApprovalDecision::Ineligible(reason) => Some(reason.as_str()),
        };
        info!(
            %invoice_id,
            lines = summary.total_lines,
            warn_lines = summary.warn_lines,
            auto_approved = decision.is_eligible(),
            reason = reason.unwrap_or("-"),
            "OCR complete"
        );
        self.notify(
            doc,
            EVENT_OCR_COMPLETED,
            json!({
                "documentId": doc.id,
                "invoiceId": invoice_id,
                "autoApproved": decision.is_eligible(),
                "ineligibleReason": reason,
                "totalLines": summary.total_lines,
                "warnLines": summary.warn_lines,
            }),
        )
        .await;
        Ok(())
    }

    /// Accounting data wins for invoice date and supplier; everything else
    /// comes from OCR. Lookup failures are treated as no override.
    async fn apply_header_override(
        &self,
        doc: &DocumentArtifact,
        mut header: ExtractedHeader,
    ) -> ExtractedHeader {
        let Some(external_ref) = doc.external_ref.as_deref() else {
            return header;
        };
        match self
            .accounting
            .find_by_external_ref(&doc.tenant_id, external_ref)
            .await
        {
            Ok(Some(found)) => {
                debug!("Applying accounting header override");
                if let Some(date) = found.invoice_date {
                    header.invoice_date = Some(date);
                }
                if let Some(name) = found.supplier_name.filter(|n| !n.trim().is_empty()) {
                    header.supplier_name = Some(name);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Accounting override lookup failed: {}", e),
        }
        header
    }

    async fn resolve_supplier(
        &self,
        doc: &DocumentArtifact,
        header: &ExtractedHeader,
    ) -> Option<ResolvedSupplier> {
        let name = header
            .supplier_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())?;
        match self.suppliers.resolve(name, &doc.tenant_id).await {
            Ok(supplier) => Some(supplier),
            Err(e) => {
                warn!("Supplier resolution failed: {}", e);
                None
            }
        }
    }

    /// Applies a human correction of an invoice. Manual verification always
    /// wins: the invoice is verified as MANUAL whatever the automated state.
    pub async fn verify(
        &self,
        invoice_id: &str,
        edits: VerificationEdits,
    ) -> Result<EnrichedStatus, PipelineError> {
        let span = info_span!("verify", invoice_id);
        self.verify_inner(invoice_id, edits).instrument(span).await
    }

    async fn verify_inner(
        &self,
        invoice_id: &str,
        edits: VerificationEdits,
    ) -> Result<EnrichedStatus, PipelineError> {
        let invoice = invoice_repo::find_by_id(&self.db, invoice_id)?
            .filter(|i| i.deleted_at.is_none())
            .ok_or_else(|| PipelineError::NotFound {
                kind: "Invoice",
                id: invoice_id.to_string(),
            })?;
        let doc = self.load(&invoice.document_id)?;
        if doc.is_deleted() {
            return Err(PipelineError::Deleted(doc.id));
        }
        if !matches!(
            doc.processing_status,
            ProcessingStatus::OcrComplete | ProcessingStatus::ManuallyUpdated
        ) {
            return Err(PipelineError::InvalidState {
                id: doc.id,
                status: doc.processing_status,
                operation: "verify",
            });
        }

        let existing: HashMap<String, LineItemRow> = invoice_repo::list_line_items(&self.db, &invoice.id)?
            .into_iter()
            .map(|line| (line.id.clone(), line))
            .collect();

        let mut legacy = Vec::with_capacity(edits.lines.len());
        for (position, edit) in edits.lines.iter().enumerate() {
            if edit.item.description.trim().is_empty() {
                return Err(PipelineError::Validation(format!(
                    "line {} has no description",
                    position + 1
                )));
            }
            let (id, modified) = match &edit.id {
                Some(id) => {
                    let stored = existing.get(id).ok_or_else(|| {
                        PipelineError::Validation(format!("unknown line item '{}'", id))
                    })?;
                    (id.clone(), stored.is_modified || stored.to_raw() != edit.item)
                }
                None => (uuid::Uuid::new_v4().to_string(), true),
            };
            legacy.push(LineItemRow::from_raw(
                id,
                &invoice.id,
                position as u32,
                &edit.item,
                modified,
            ));
        }

        let header = edits.header;
        let supplier = match header.supplier_name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => Some(self.suppliers.resolve(name, &doc.tenant_id).await?),
            None => None,
        };

        let lines: Vec<CanonicalLine> = legacy
            .iter()
            .zip(&edits.lines)
            .map(|(row, edit)| {
                self.canonicalizer.canonicalize_line(
                    LineInput {
                        source: SourceLineRef::LegacyId(row.id.clone()),
                        item: &edit.item,
                        modified: row.is_modified,
                    },
                    header.currency.as_deref(),
                )
            })
            .collect();

        let now = now_timestamp();
        let updated = InvoiceRow {
            invoice_number: header.invoice_number,
            invoice_date: header.invoice_date,
            currency: header.currency.map(|c| c.trim().to_uppercase()),
            subtotal: header.subtotal,
            tax: header.tax,
            total: header.total,
            supplier_id: supplier.as_ref().map(|s| s.supplier_id.clone()),
            supplier_name: supplier.as_ref().map(|s| s.name.clone()),
            updated_at: now.clone(),
            ..invoice
        };
        let expected = doc.version();
        let to_manual = StateChange::new(ProcessingStatus::ManuallyUpdated, doc.ocr_attempt_count);

        let summary = self.db.transaction(|tx| {
            let outcome = document_repo::compare_and_set(tx, &doc.id, &expected, &to_manual, &now)?;
            if outcome == CasOutcome::LostRace {
                return Err(PipelineError::Conflict(doc.id.clone()));
            }
            invoice_repo::update_header(tx, &updated)?;
            invoice_repo::replace_line_items(tx, &updated.id, &legacy)?;
            let summary = canonical_repo::replace_for_invoice(tx, &updated.id, &lines, &now)?;
            invoice_repo::force_verified(tx, &updated.id, VerificationSource::Manual, &now)?;
            document_repo::set_review(
                tx,
                &doc.id,
                ReviewStatus::Verified,
                Some(VerificationSource::Manual),
                &now,
            )?;
            Ok(summary)
        })?;

        info!(
            lines = summary.total_lines,
            manual_edits = summary.manual_edits,
            warn_lines = summary.warn_lines,
            "Invoice manually verified"
        );
        let current = self.load(&doc.id)?;
        self.enrich(current)
    }

    /// Re-runs OCR on request. Failed documents start directly; completed,
    /// unverified ones are reset to `PENDING_OCR` first. Verified documents
    /// are left alone.
    pub async fn retry(&self, document_id: &str) -> Result<StartOutcome, PipelineError> {
        let doc = self.load(document_id)?;
        if doc.is_deleted() {
            return Err(PipelineError::Deleted(doc.id));
        }
        if doc.is_verified() || doc.processing_status == ProcessingStatus::ManuallyUpdated {
            return Err(PipelineError::InvalidState {
                id: doc.id,
                status: doc.processing_status,
                operation: "retry verified",
            });
        }

        match doc.processing_status {
            ProcessingStatus::OcrFailed => self.start_job(document_id).await,
            ProcessingStatus::OcrComplete => {
                if doc.ocr_attempt_count >= self.config.max_attempts {
                    return Err(PipelineError::AttemptsExhausted {
                        attempts: doc.ocr_attempt_count,
                        max: self.config.max_attempts,
                    });
                }
                let reset = StateChange::new(ProcessingStatus::PendingOcr, doc.ocr_attempt_count);
                let outcome = document_repo::transition(
                    &self.db,
                    &doc.id,
                    &doc.version(),
                    &reset,
                    &now_timestamp(),
                )?;
                if outcome == CasOutcome::LostRace {
                    debug!(document_id, "Lost the race resetting for retry");
                    return Ok(StartOutcome::LostRace);
                }
                info!(document_id, "Completed document reset for retry");
                self.start_job(document_id).await
            }
            status => Err(PipelineError::InvalidState {
                id: doc.id,
                status,
                operation: "retry",
            }),
        }
    }

    /// Webhook entry point. Unknown job ids are ignored.
    pub async fn handle_provider_callback(
        &self,
        job_id: &str,
    ) -> Result<Option<EnrichedStatus>, PipelineError> {
        match document_repo::find_by_job_id(&self.db, job_id)? {
            Some(doc) => self.poll(&doc.id).await.map(Some),
            None => {
                debug!(job_id, "Callback for unknown job");
                Ok(None)
            }
        }
    }

    /// Returns false if the document was already deleted.
    pub fn soft_delete(&self, document_id: &str) -> Result<bool, PipelineError> {
        self.load(document_id)?;
        let deleted = document_repo::soft_delete(&self.db, document_id, &now_timestamp())?;
        if deleted {
            info!(document_id, "Document deleted");
        }
        Ok(deleted)
    }

    /// Returns false if the document was not deleted.
    pub fn restore(&self, document_id: &str) -> Result<bool, PipelineError> {
        self.load(document_id)?;
        let restored = document_repo::restore(&self.db, document_id, &now_timestamp())?;
        if restored {
            info!(document_id, "Document restored");
        }
        Ok(restored)
    }

    /// Time-limited URL for the original upload.
    pub async fn read_url(&self, document_id: &str, ttl: Duration) -> Result<String, PipelineError> {
        let doc = self.load(document_id)?;
        if doc.is_deleted() {
            return Err(PipelineError::Deleted(doc.id));
        }
        Ok(self
            .blobs
            .signed_read_url(&doc.storage_key, &doc.mime_type, ttl)
            .await?)
    }

    /// Sweeps stale documents, then starts the next attempt of every
    /// document the sweep reset.
    pub async fn reclaim_orphans(&self) -> Result<ReclaimReport, PipelineError> {
        let report = self.reclaimer.reclaim_orphans().await?;
        for document_id in &report.reset_ids {
            match self.start_job(document_id).await {
                Ok(outcome) => debug!(%document_id, ?outcome, "Restarted reclaimed document"),
                Err(e) => warn!(%document_id, "Restart after reclaim failed: {}", e),
            }
        }
        Ok(report)
    }

    /// Returns the document with its live invoice and quality summary.
    pub fn status(&self, document_id: &str) -> Result<EnrichedStatus, PipelineError> {
        let doc = self.load(document_id)?;
        self.enrich(doc)
    }

    fn load(&self, document_id: &str) -> Result<DocumentArtifact, PipelineError> {
        document_repo::find_by_id(&self.db, document_id)?
            .ok_or_else(|| PipelineError::document_not_found(document_id))
    }

    fn enrich(&self, doc: DocumentArtifact) -> Result<EnrichedStatus, PipelineError> {
        let invoice = invoice_repo::find_live_by_document(&self.db, &doc.id)?;
        let line_quality = match &invoice {
            Some(invoice) => canonical_repo::find_summary(&self.db, &invoice.id)?,
            None => None,
        };
        Ok(EnrichedStatus::new(doc, invoice, line_quality))
    }

    /// Conditionally moves the document to `OCR_FAILED` and announces it.
    async fn fail(
        &self,
        doc: &DocumentArtifact,
        expected: &StateVersion,
        classification: &FailureClassification,
        confidence: Option<f64>,
    ) -> Result<CasOutcome, PipelineError> {
        let change = StateChange::new(ProcessingStatus::OcrFailed, expected.attempt_count)
            .with_failure(classification.category, classification.detail.clone())
            .with_confidence(confidence);
        let outcome =
            document_repo::transition(&self.db, &doc.id, expected, &change, &now_timestamp())?;

        match outcome {
            CasOutcome::Applied => {
                self.notify(
                    doc,
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
            CasOutcome::LostRace => debug!("Lost the race recording the failure"),
        }
        Ok(outcome)
    }

    async fn notify(&self, doc: &DocumentArtifact, event: &str, payload: serde_json::Value) {
        publish_best_effort(
            self.notifier.as_ref(),
            &tenant_channel(&doc.tenant_id),
            event,
            payload,
        )
        .await;
    }
}

/// Marks the invoice verified (AUTO) on eligibility, otherwise flags the
/// document for review. Re-applying a decision to a verified invoice is a
/// no-op.
fn apply_decision(
    conn: &rusqlite::Connection,
    document_id: &str,
    invoice_id: &str,
    decision: &AutoApprovalDecision,
    now: &str,
) -> Result<(), DatabaseError> {
    match decision {
        AutoApprovalDecision::Eligible => {
            if invoice_repo::mark_verified(conn, invoice_id, VerificationSource::Auto, now)? {
                document_repo::set_review(
                    conn,
                    document_id,
                    ReviewStatus::Verified,
                    Some(VerificationSource::Auto),
                    now,
                )?;
            }
        }
        AutoApprovalDecision::Ineligible(IneligibleReason::AlreadyVerified) => {}
        AutoApprovalDecision::Ineligible(_) => {
            document_repo::set_review(conn, document_id, ReviewStatus::NeedsReview, None, now)?;
        }
    }
    Ok(())
}

fn has_text(raw: Option<&str>) -> bool {
    raw.is_some_and(|r| !r.trim().is_empty())
}

/// Header amounts that do not parse cleanly are left empty for review.
fn invoice_from_header(
    document_id: &str,
    header: &ExtractedHeader,
    supplier: Option<&ResolvedSupplier>,
    now: &str,
) -> InvoiceRow {
    let amount = |raw: Option<&String>, kind: FieldKind| {
        raw.map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .and_then(|r| parse_amount(r, kind).value)
    };

    InvoiceRow {
        id: uuid::Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        invoice_number: header
            .invoice_number
            .as_ref()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        invoice_date: header.invoice_date,
        currency: header
            .currency
            .as_ref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty()),
        subtotal: amount(header.subtotal.as_ref(), FieldKind::Subtotal),
        tax: amount(header.tax.as_ref(), FieldKind::Tax),
        total: amount(header.total.as_ref(), FieldKind::InvoiceTotal),
        supplier_id: supplier.map(|s| s.supplier_id.clone()),
        supplier_name: supplier
            .map(|s| s.name.clone())
            .or_else(|| header.supplier_name.clone()),
        is_verified: false,
        verification_source: None,
        verified_at: None,
        deleted_at: None,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}
