//! Orphan recovery through the pipeline.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use common::*;
use invoq::broadcast::EVENT_OCR_FAILED;
use invoq::db::document_repo;
use invoq::document::{DocumentArtifact, DocumentMetadata, ProcessingStatus};
use invoq::ocr::OcrFailureCategory;
use invoq::reclaimer::{ReclaimScheduler, ReclaimTask};

/// Inserts a document that never reached the provider.
fn insert_orphan(harness: &TestHarness, id: &str, status: ProcessingStatus, attempts: u32) {
    let mut doc = DocumentArtifact::new_pending(
        id.to_string(),
        &DocumentMetadata::new(TENANT, "invoice.pdf"),
        format!("{}/{}/invoice.pdf", TENANT, id),
        "application/pdf".to_string(),
        STALE,
    );
    doc.processing_status = status;
    doc.ocr_attempt_count = attempts;
    document_repo::insert(&harness.db, &doc).expect("insert failed");
}

#[tokio::test]
async fn test_orphan_with_attempts_left_is_restarted() {
    let harness = TestHarness::new();
    insert_orphan(&harness, "d1", ProcessingStatus::OcrProcessing, 1);

    let report = harness.pipeline.reclaim_orphans().await.unwrap();
    assert_eq!(report.reset, 1);
    assert_eq!(report.reset_ids, vec!["d1".to_string()]);

    let doc = harness.document("d1");
    assert_eq!(doc.processing_status, ProcessingStatus::OcrProcessing);
    assert_eq!(doc.ocr_attempt_count, 3);
    assert_eq!(doc.ocr_job_id.as_deref(), Some("job-1"));
    assert_eq!(harness.provider.start_calls(), 1);
}

#[tokio::test]
async fn test_second_attempt_reset_then_exhausted() {
    let harness = TestHarness::new();
    insert_orphan(&harness, "d1", ProcessingStatus::PendingOcr, 2);

    let report = harness.pipeline.reclaim_orphans().await.unwrap();
    assert_eq!(report.reset, 1);
    let doc = harness.document("d1");
    assert_eq!(doc.processing_status, ProcessingStatus::PendingOcr);
    assert_eq!(doc.ocr_attempt_count, 3);
    assert_eq!(harness.provider.start_calls(), 0);

    // Fresh after the reset: the next sweep ignores it.
    let report = harness.pipeline.reclaim_orphans().await.unwrap();
    assert_eq!(report.examined, 0);

    harness.backdate("d1");
    let report = harness.pipeline.reclaim_orphans().await.unwrap();
    assert_eq!(report.failed, 1);

    let doc = harness.document("d1");
    assert_eq!(doc.processing_status, ProcessingStatus::OcrFailed);
    assert_eq!(doc.ocr_attempt_count, 3);
    assert_eq!(
        doc.ocr_failure_category,
        Some(OcrFailureCategory::ProviderTimeout)
    );

    let events = harness.notifier.named(EVENT_OCR_FAILED);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["documentId"], "d1");
    assert_eq!(events[0].payload["category"], "PROVIDER_TIMEOUT");
}

#[tokio::test]
async fn test_running_and_deleted_documents_are_not_orphans() {
    let harness = TestHarness::new();
    let running = harness.submit_pdf().await;
    harness.backdate(&running.id);

    insert_orphan(&harness, "gone", ProcessingStatus::PendingOcr, 1);
    harness.pipeline.soft_delete("gone").unwrap();
    harness.backdate("gone");

    let report = harness.pipeline.reclaim_orphans().await.unwrap();
    assert_eq!(report.examined, 0);
    assert_eq!(harness.document("gone").ocr_attempt_count, 1);
}

#[test]
fn test_scheduler_sweeps_on_trigger() {
    let harness = TestHarness::new();
    insert_orphan(&harness, "d1", ProcessingStatus::PendingOcr, 3);

    let task: Arc<dyn ReclaimTask> = harness.pipeline.clone();
    let scheduler = ReclaimScheduler::new(task, Duration::from_secs(3600));
    let (trigger_tx, trigger_rx) = broadcast::channel(4);
    let handle = scheduler.start(trigger_rx);

    trigger_tx.send(()).unwrap();
    for _ in 0..200 {
        if harness.document("d1").processing_status == ProcessingStatus::OcrFailed {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    scheduler.stop();
    let _ = trigger_tx.send(());
    handle.join().expect("scheduler thread panicked");

    assert_eq!(
        harness.document("d1").processing_status,
        ProcessingStatus::OcrFailed
    );
}
