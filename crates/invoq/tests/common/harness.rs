//! Test harness for isolated pipeline runs.
//!
//! The `TestHarness` wires an `OcrPipeline` to an in-memory database and
//! scripted fakes for every external service:
//! - `ScriptedProvider` returns queued job results and counts calls
//! - `MemoryBlobStore` keeps uploads in a map
//! - `RecordingNotifier` captures published events
//! - `StaticAccounting` serves header overrides by external reference
//! - `CapturedLogs` collects formatted tracing output for the current thread

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;

use invoq::db::supplier_repo::SqliteSupplierDirectory;
use invoq::db::{document_repo, location_repo, now_timestamp, supplier_repo, Database};
use invoq::document::{DocumentArtifact, DocumentMetadata};
use invoq::error::{IntegrationError, NotifyError, ProviderError, StorageError};
use invoq::integrations::{AccountingOverrideLookup, HeaderOverride, SupplierStatus};
use invoq::ocr::{OcrDocument, OcrJobRequest, OcrJobResult, OcrProvider};
use invoq::pipeline::{Collaborators, OcrPipeline, PipelineConfig};
use invoq::preprocess::RasterTransformer;
use invoq::quality::Dictionary;
use invoq::storage::BlobStore;
use invoq::RealtimeNotifier;

pub const TENANT: &str = "tenant-1";
pub const LOCATION: &str = "loc-1";
pub const STALE: &str = "2020-01-01T00:00:00.000Z";

/// OCR provider whose answers are set by the test.
#[derive(Default)]
pub struct ScriptedProvider {
    start_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    start_failure: Mutex<Option<(String, String)>>,
    result: Mutex<Option<OcrJobResult>>,
    barrier: Mutex<Option<Arc<Barrier>>>,
    requests: Mutex<Vec<OcrJobRequest>>,
}

impl ScriptedProvider {
    /// Every following start is rejected with this provider error code.
    pub fn reject_starts(&self, code: &str, message: &str) {
        *self.start_failure.lock().unwrap() = Some((code.to_string(), message.to_string()));
    }

    pub fn accept_starts(&self) {
        *self.start_failure.lock().unwrap() = None;
    }

    pub fn set_result(&self, result: OcrJobResult) {
        *self.result.lock().unwrap() = Some(result);
    }

    pub fn succeed_with(&self, document: OcrDocument) {
        self.set_result(OcrJobResult::Succeeded(document));
    }

    /// Polls wait on the barrier after being counted, so concurrent polls
    /// all read the document before any of them writes.
    pub fn hold_polls(&self, parties: usize) {
        *self.barrier.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<OcrJobRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrProvider for ScriptedProvider {
    async fn start_job(&self, request: &OcrJobRequest) -> Result<String, ProviderError> {
        let n = self.start_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        if let Some((code, message)) = self.start_failure.lock().unwrap().clone() {
            return Err(ProviderError::Rejected { code, message });
        }
        Ok(format!("job-{}", n))
    }

    async fn get_job_result(&self, _job_id: &str) -> Result<OcrJobResult, ProviderError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let barrier = self.barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        Ok(self
            .result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(OcrJobResult::InProgress))
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.blobs.lock().unwrap().insert(key.to_string(), bytes);
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn signed_read_url(
        &self,
        key: &str,
        _content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        if !self.contains(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(format!("memory://{}?expires_in={}", key, ttl.as_secs()))
    }
}

#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub channel: String,
    pub event: String,
    pub payload: serde_json::Value,
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<PublishedEvent>>,
}

impl RecordingNotifier {
    pub fn named(&self, event: &str) -> Vec<PublishedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event == event)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RealtimeNotifier for RecordingNotifier {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(PublishedEvent {
            channel: channel.to_string(),
            event: event.to_string(),
            payload,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticAccounting {
    overrides: Mutex<HashMap<String, HeaderOverride>>,
}

impl StaticAccounting {
    pub fn insert(&self, external_ref: &str, header: HeaderOverride) {
        self.overrides
            .lock()
            .unwrap()
            .insert(external_ref.to_string(), header);
    }
}

#[async_trait]
impl AccountingOverrideLookup for StaticAccounting {
    async fn find_by_external_ref(
        &self,
        _tenant_id: &str,
        external_ref: &str,
    ) -> Result<Option<HeaderOverride>, IntegrationError> {
        Ok(self.overrides.lock().unwrap().get(external_ref).cloned())
    }
}

/// Formatted log lines written while the guard from [`capture_logs`] lives.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Routes tracing output on this thread into a buffer. Works with the
/// default single-threaded `#[tokio::test]` runtime.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

/// Pipeline over an in-memory database with scripted collaborators.
pub struct TestHarness {
    pub db: Database,
    pub provider: Arc<ScriptedProvider>,
    pub blobs: Arc<MemoryBlobStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub accounting: Arc<StaticAccounting>,
    pub pipeline: Arc<OcrPipeline>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let db = Database::open_in_memory().expect("Failed to create test database");
        let provider = Arc::new(ScriptedProvider::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let accounting = Arc::new(StaticAccounting::default());

        let collaborators = Collaborators {
            blobs: blobs.clone(),
            provider: provider.clone(),
            transformer: Arc::new(RasterTransformer::new()),
            suppliers: Arc::new(SqliteSupplierDirectory::new(db.clone())),
            accounting: accounting.clone(),
            notifier: notifier.clone(),
            dictionary: Arc::new(Dictionary::disabled()),
        };
        let pipeline = Arc::new(OcrPipeline::new(config, db.clone(), collaborators));

        Self {
            db,
            provider,
            blobs,
            notifier,
            accounting,
            pipeline,
        }
    }

    /// Submits a one-byte PDF for the default tenant and location.
    pub async fn submit_pdf(&self) -> DocumentArtifact {
        self.submit(self.metadata("invoice.pdf")).await
    }

    pub async fn submit(&self, metadata: DocumentMetadata) -> DocumentArtifact {
        self.pipeline
            .submit(metadata, b"%PDF-1.7".to_vec())
            .await
            .expect("submit failed")
    }

    pub fn metadata(&self, filename: &str) -> DocumentMetadata {
        DocumentMetadata {
            location_id: Some(LOCATION.to_string()),
            ..DocumentMetadata::new(TENANT, filename)
        }
    }

    pub fn document(&self, id: &str) -> DocumentArtifact {
        document_repo::find_by_id(&self.db, id)
            .expect("document lookup failed")
            .expect("document missing")
    }

    pub fn enable_auto_approve(&self) {
        location_repo::set_auto_approve(&self.db, LOCATION, true, &now_timestamp())
            .expect("Failed to enable auto-approve");
    }

    /// Creates the supplier and marks it trusted.
    pub fn trust_supplier(&self, name: &str) {
        let row = self
            .db
            .with_conn(|conn| supplier_repo::find_or_create(conn, TENANT, name, &now_timestamp()))
            .expect("Failed to create supplier");
        supplier_repo::set_status(&self.db, &row.id, SupplierStatus::Active, &now_timestamp())
            .expect("Failed to activate supplier");
    }

    /// Invoices ever written for a document, live or not.
    pub fn invoice_count(&self, document_id: &str) -> i64 {
        self.db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM extracted_invoices WHERE document_id = ?1",
                    [document_id],
                    |r| r.get(0),
                )?)
            })
            .expect("count failed")
    }

    /// Moves `updated_at` past the staleness window.
    pub fn backdate(&self, document_id: &str) {
        self.db
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE documents SET updated_at = ?2 WHERE id = ?1",
                    [document_id, STALE],
                )?;
                Ok(())
            })
            .expect("backdate failed");
    }
}
