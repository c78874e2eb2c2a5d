//! End-to-end tests of the OCR job state machine against scripted fakes.

mod common;

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use common::*;
use invoq::broadcast::{EVENT_OCR_COMPLETED, EVENT_OCR_FAILED};
use invoq::db::{canonical_repo, invoice_repo};
use invoq::document::{ProcessingStatus, ReviewStatus, VerificationSource};
use invoq::integrations::HeaderOverride;
use invoq::ocr::{OcrFailureCategory, OcrJobResult, ProviderFailure};
use invoq::pipeline::{PipelineError, StartOutcome};

#[tokio::test]
async fn test_submit_starts_first_attempt() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;

    assert_eq!(doc.processing_status, ProcessingStatus::OcrProcessing);
    assert_eq!(doc.ocr_attempt_count, 1);
    assert_eq!(doc.ocr_job_id.as_deref(), Some("job-1"));
    assert_eq!(doc.mime_type, "application/pdf");
    assert!(harness.blobs.contains(&doc.storage_key));

    let requests = harness.provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].key, doc.storage_key);
    assert!(!requests[0].native_deskew);
}

#[tokio::test]
async fn test_submit_rejects_bad_uploads() {
    let harness = TestHarness::new();

    let empty = harness
        .pipeline
        .submit(harness.metadata("invoice.pdf"), Vec::new())
        .await;
    assert!(matches!(empty, Err(PipelineError::Validation(_))));

    let text = harness
        .pipeline
        .submit(harness.metadata("notes.txt"), b"hello".to_vec())
        .await;
    assert!(matches!(text, Err(PipelineError::Validation(_))));

    let unknown = harness
        .pipeline
        .submit(harness.metadata("upload"), b"data".to_vec())
        .await;
    assert!(matches!(unknown, Err(PipelineError::Validation(_))));

    assert_eq!(harness.provider.start_calls(), 0);
}

#[tokio::test]
async fn test_attempt_cap_stops_provider_calls() {
    let harness = TestHarness::new();
    harness
        .provider
        .reject_starts("ThrottlingException", "Rate exceeded");

    let doc = harness.submit_pdf().await;
    assert_eq!(doc.processing_status, ProcessingStatus::OcrFailed);
    assert_eq!(doc.ocr_attempt_count, 1);
    assert_eq!(
        doc.ocr_failure_category,
        Some(OcrFailureCategory::ProviderTimeout)
    );

    for expected_attempt in 2..=3 {
        let outcome = harness.pipeline.retry(&doc.id).await.unwrap();
        assert!(matches!(outcome, StartOutcome::Failed(_)));
        assert_eq!(harness.document(&doc.id).ocr_attempt_count, expected_attempt);
    }

    let fourth = harness.pipeline.retry(&doc.id).await;
    assert!(matches!(
        fourth,
        Err(PipelineError::AttemptsExhausted { attempts: 3, max: 3 })
    ));
    assert_eq!(harness.provider.start_calls(), 3);
    assert_eq!(harness.document(&doc.id).ocr_attempt_count, 3);
    assert_eq!(harness.notifier.named(EVENT_OCR_FAILED).len(), 3);
}

#[tokio::test]
async fn test_start_of_unknown_document_logs_error() {
    let harness = TestHarness::new();
    let (logs, _guard) = capture_logs();

    let result = harness.pipeline.start_job("no-such-document").await;
    assert!(matches!(result, Err(PipelineError::NotFound { .. })));
    assert_eq!(harness.provider.start_calls(), 0);

    let output = logs.contents();
    assert!(output.contains("ERROR"), "{}", output);
    assert!(output.contains("Cannot start OCR"), "{}", output);
}

#[tokio::test]
async fn test_poll_in_progress_changes_nothing() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;

    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(status.document.processing_status, ProcessingStatus::OcrProcessing);
    assert_eq!(status.document.updated_at, doc.updated_at);
    assert!(status.invoice.is_none());
}

#[tokio::test]
async fn test_successful_poll_writes_invoice_once() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());

    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(status.document.processing_status, ProcessingStatus::OcrComplete);
    assert_eq!(status.document.review_status, ReviewStatus::NeedsReview);
    assert_eq!(status.document.confidence_score, Some(97.0));

    let invoice = status.invoice.clone().unwrap();
    assert_eq!(invoice.currency.as_deref(), Some("USD"));
    assert_eq!(invoice.total, Some(Decimal::new(12345, 2)));
    assert_eq!(invoice.supplier_name.as_deref(), Some(SUPPLIER));
    assert!(invoice.supplier_id.is_some());
    assert!(!invoice.is_verified);

    let quality = status.line_quality.unwrap();
    assert_eq!(quality.total_lines, 2);
    assert_eq!(quality.warn_lines, 0);

    // A second poll finds no running job and does not call the provider.
    let polls = harness.provider.poll_calls();
    let again = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(harness.provider.poll_calls(), polls);
    assert_eq!(again.invoice_id, status.invoice_id);
    assert_eq!(harness.invoice_count(&doc.id), 1);
    assert_eq!(harness.notifier.named(EVENT_OCR_COMPLETED).len(), 1);
}

#[tokio::test]
async fn test_concurrent_polls_complete_once() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());
    harness.provider.hold_polls(2);

    let (first, second) = tokio::join!(
        harness.pipeline.poll(&doc.id),
        harness.pipeline.poll(&doc.id)
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(harness.provider.poll_calls(), 2);
    assert_eq!(harness.invoice_count(&doc.id), 1);
    assert_eq!(harness.notifier.named(EVENT_OCR_COMPLETED).len(), 1);
    assert_eq!(first.invoice_id, second.invoice_id);
    assert_eq!(
        harness.document(&doc.id).processing_status,
        ProcessingStatus::OcrComplete
    );
}

#[tokio::test]
async fn test_thin_result_fails_as_not_a_document() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().word_count(3).build());

    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(status.document.processing_status, ProcessingStatus::OcrFailed);
    assert!(status.document.ocr_job_id.is_none());
    let failure = status.failure.unwrap();
    assert_eq!(failure.category, OcrFailureCategory::NotADocument);
    assert_eq!(harness.invoice_count(&doc.id), 0);

    let events = harness.notifier.named(EVENT_OCR_FAILED);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["category"], "NOT_A_DOCUMENT");
    assert_eq!(events[0].channel, format!("tenant-{}", TENANT));
}

#[tokio::test]
async fn test_provider_failure_is_classified() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;
    harness.provider.set_result(OcrJobResult::Failed {
        error: Some(ProviderFailure::new("BadDocumentException", "Image is blurry")),
        confidence: Some(55.0),
        word_count: Some(40),
    });

    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(status.document.processing_status, ProcessingStatus::OcrFailed);
    assert!(status.failure.is_some());

    // Failed documents can be retried while attempts remain.
    harness.provider.set_result(OcrJobResult::InProgress);
    let outcome = harness.pipeline.retry(&doc.id).await.unwrap();
    assert_eq!(
        outcome,
        StartOutcome::Started {
            job_id: "job-2".to_string(),
            attempt: 2
        }
    );
    let retried = harness.document(&doc.id);
    assert!(retried.ocr_failure_category.is_none());
    assert_eq!(retried.ocr_job_id.as_deref(), Some("job-2"));
}

#[tokio::test]
async fn test_auto_approval_disabled_for_location() {
    let harness = TestHarness::new();
    harness.trust_supplier(SUPPLIER);
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());

    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert!(!status.invoice.unwrap().is_verified);

    let events = harness.notifier.named(EVENT_OCR_COMPLETED);
    assert_eq!(events[0].payload["autoApproved"], false);
    assert_eq!(events[0].payload["ineligibleReason"], "FEATURE_DISABLED");
}

#[tokio::test]
async fn test_auto_approval_blocked_by_excluded_lines() {
    let harness = TestHarness::new();
    harness.enable_auto_approve();
    harness.trust_supplier(SUPPLIER);
    let doc = harness.submit_pdf().await;
    harness.provider.succeed_with(
        InvoicePayloadBuilder::new()
            .line(line("Whole Milk 1 gal", "1", "1.234", "1.234"))
            .build(),
    );

    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(status.document.review_status, ReviewStatus::NeedsReview);
    assert_eq!(status.line_quality.unwrap().warn_lines, 1);

    let events = harness.notifier.named(EVENT_OCR_COMPLETED);
    assert_eq!(events[0].payload["ineligibleReason"], "HAS_EXCLUDED_LINES");
}

#[tokio::test]
async fn test_auto_approval_blocked_by_unreadable_total() {
    let harness = TestHarness::new();
    harness.enable_auto_approve();
    harness.trust_supplier(SUPPLIER);
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().total("(1.234)").build());

    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(status.document.review_status, ReviewStatus::NeedsReview);
    assert_eq!(status.invoice.unwrap().total, None);

    let events = harness.notifier.named(EVENT_OCR_COMPLETED);
    assert_eq!(events[0].payload["autoApproved"], false);
    assert_eq!(events[0].payload["ineligibleReason"], "UNREADABLE_TOTAL");
}

#[tokio::test]
async fn test_auto_approval_blocked_by_untrusted_supplier() {
    let harness = TestHarness::new();
    harness.enable_auto_approve();
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());

    harness.pipeline.poll(&doc.id).await.unwrap();

    let events = harness.notifier.named(EVENT_OCR_COMPLETED);
    assert_eq!(events[0].payload["ineligibleReason"], "SUPPLIER_NOT_TRUSTED");
}

#[tokio::test]
async fn test_auto_approval_verifies_clean_invoice() {
    let harness = TestHarness::new();
    harness.enable_auto_approve();
    harness.trust_supplier(SUPPLIER);
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());

    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(status.document.review_status, ReviewStatus::Verified);
    assert_eq!(
        status.document.verification_source,
        Some(VerificationSource::Auto)
    );
    let invoice = status.invoice.unwrap();
    assert!(invoice.is_verified);
    assert_eq!(invoice.verification_source, Some(VerificationSource::Auto));

    let events = harness.notifier.named(EVENT_OCR_COMPLETED);
    assert_eq!(events[0].payload["autoApproved"], true);
    assert!(events[0].payload["ineligibleReason"].is_null());

    // Verified documents are not re-run.
    let retry = harness.pipeline.retry(&doc.id).await;
    assert!(matches!(retry, Err(PipelineError::InvalidState { .. })));
}

#[tokio::test]
async fn test_accounting_override_wins_for_date_and_supplier() {
    let harness = TestHarness::new();
    harness.accounting.insert(
        "PO-77",
        HeaderOverride {
            invoice_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            supplier_name: Some("Fresh Farms".to_string()),
        },
    );
    let mut metadata = harness.metadata("invoice.pdf");
    metadata.external_ref = Some("PO-77".to_string());
    let doc = harness.submit(metadata).await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());

    let invoice = harness.pipeline.poll(&doc.id).await.unwrap().invoice.unwrap();
    assert_eq!(invoice.invoice_date, NaiveDate::from_ymd_opt(2026, 2, 1));
    assert_eq!(invoice.supplier_name.as_deref(), Some("Fresh Farms"));
    assert_eq!(invoice.invoice_number.as_deref(), Some("INV-1001"));
}

#[tokio::test]
async fn test_manual_verification_records_edits() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());
    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    let invoice_id = status.invoice_id.unwrap();

    let stored = invoice_repo::list_line_items(&harness.db, &invoice_id).unwrap();
    assert_eq!(stored.len(), 2);

    let edits = EditsBuilder::new()
        .keep(&stored[0].id, stored[0].to_raw())
        .keep(&stored[1].id, line("Frozen Brontosaurus Ribs", "2", "30.00", "60.00"))
        .add(line("Whole Milk 1 gal", "4", "3.50", "14.00"))
        .total(Decimal::new(16400, 2))
        .build();

    let verified = harness.pipeline.verify(&invoice_id, edits).await.unwrap();
    assert_eq!(
        verified.document.processing_status,
        ProcessingStatus::ManuallyUpdated
    );
    assert_eq!(verified.document.review_status, ReviewStatus::Verified);
    assert_eq!(
        verified.document.verification_source,
        Some(VerificationSource::Manual)
    );
    let invoice = verified.invoice.unwrap();
    assert_eq!(invoice.id, invoice_id);
    assert_eq!(invoice.total, Some(Decimal::new(16400, 2)));
    assert_eq!(invoice.verification_source, Some(VerificationSource::Manual));

    let lines = invoice_repo::list_line_items(&harness.db, &invoice_id).unwrap();
    assert_eq!(lines.len(), 3);
    assert!(!lines[0].is_modified);
    assert!(lines[1].is_modified);
    assert!(lines[2].is_modified);

    let summary = canonical_repo::find_summary(&harness.db, &invoice_id)
        .unwrap()
        .unwrap();
    assert_eq!(summary.total_lines, 3);
    assert_eq!(summary.manual_edits, 2);

    // The document can be corrected again, but not re-run.
    let again = EditsBuilder::new()
        .keep(&lines[0].id, lines[0].to_raw())
        .build();
    harness.pipeline.verify(&invoice_id, again).await.unwrap();
    let retry = harness.pipeline.retry(&doc.id).await;
    assert!(matches!(retry, Err(PipelineError::InvalidState { .. })));
}

#[tokio::test]
async fn test_manual_verification_overrides_auto() {
    let harness = TestHarness::new();
    harness.enable_auto_approve();
    harness.trust_supplier(SUPPLIER);
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());
    let invoice_id = harness
        .pipeline
        .poll(&doc.id)
        .await
        .unwrap()
        .invoice_id
        .unwrap();

    let lines = invoice_repo::list_line_items(&harness.db, &invoice_id).unwrap();
    let edits = EditsBuilder::new()
        .keep(&lines[0].id, lines[0].to_raw())
        .keep(&lines[1].id, lines[1].to_raw())
        .build();
    let verified = harness.pipeline.verify(&invoice_id, edits).await.unwrap();

    assert_eq!(
        verified.invoice.unwrap().verification_source,
        Some(VerificationSource::Manual)
    );
}

#[tokio::test]
async fn test_verify_rejects_unknown_line() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());
    let invoice_id = harness
        .pipeline
        .poll(&doc.id)
        .await
        .unwrap()
        .invoice_id
        .unwrap();

    let edits = EditsBuilder::new()
        .keep("no-such-line", line("Butter", "1", "2.00", "2.00"))
        .build();
    let result = harness.pipeline.verify(&invoice_id, edits).await;
    assert!(matches!(result, Err(PipelineError::Validation(_))));
    assert_eq!(
        harness.document(&doc.id).processing_status,
        ProcessingStatus::OcrComplete
    );
}

#[tokio::test]
async fn test_verify_requires_completed_document() {
    let harness = TestHarness::new();
    let result = harness
        .pipeline
        .verify("missing", EditsBuilder::new().build())
        .await;
    assert!(matches!(result, Err(PipelineError::NotFound { .. })));
}

#[tokio::test]
async fn test_retry_of_completed_document_starts_new_attempt() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());
    harness.pipeline.poll(&doc.id).await.unwrap();

    harness.provider.set_result(OcrJobResult::InProgress);
    let outcome = harness.pipeline.retry(&doc.id).await.unwrap();
    assert!(matches!(outcome, StartOutcome::Started { attempt: 2, .. }));

    // The second completion replaces the live invoice.
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());
    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(status.document.ocr_attempt_count, 2);
    assert_eq!(harness.invoice_count(&doc.id), 2);
    assert!(status.invoice.is_some());
}

#[tokio::test]
async fn test_provider_callback_finds_document_by_job() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());

    let status = harness
        .pipeline
        .handle_provider_callback("job-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.document.id, doc.id);
    assert_eq!(status.document.processing_status, ProcessingStatus::OcrComplete);

    let unknown = harness
        .pipeline
        .handle_provider_callback("job-404")
        .await
        .unwrap();
    assert!(unknown.is_none());
}

#[tokio::test]
async fn test_deleted_documents_are_left_alone() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;
    harness
        .provider
        .succeed_with(InvoicePayloadBuilder::new().build());

    assert!(harness.pipeline.soft_delete(&doc.id).unwrap());
    assert!(!harness.pipeline.soft_delete(&doc.id).unwrap());

    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(status.document.processing_status, ProcessingStatus::OcrProcessing);
    assert_eq!(harness.provider.poll_calls(), 0);

    let url = harness
        .pipeline
        .read_url(&doc.id, Duration::from_secs(60))
        .await;
    assert!(matches!(url, Err(PipelineError::Deleted(_))));

    assert!(harness.pipeline.restore(&doc.id).unwrap());
    let status = harness.pipeline.poll(&doc.id).await.unwrap();
    assert_eq!(status.document.processing_status, ProcessingStatus::OcrComplete);
}

#[tokio::test]
async fn test_read_url_for_original() {
    let harness = TestHarness::new();
    let doc = harness.submit_pdf().await;

    let url = harness
        .pipeline
        .read_url(&doc.id, Duration::from_secs(300))
        .await
        .unwrap();
    assert_eq!(url, format!("memory://{}?expires_in=300", doc.storage_key));

    let missing = harness.pipeline.soft_delete("missing");
    assert!(matches!(missing, Err(PipelineError::NotFound { .. })));
}
