pub mod approval;
pub mod broadcast;
pub mod canonical;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod integrations;
pub mod logging;
pub mod ocr;
pub mod parsing;
pub mod pipeline;
pub mod preprocess;
pub mod quality;
pub mod reclaimer;
pub mod sanitize;
pub mod storage;

pub use approval::{evaluate, ApprovalInput, AutoApprovalDecision, IneligibleReason};
pub use broadcast::{BroadcastNotifier, RealtimeEvent, RealtimeNotifier};
pub use canonical::{CanonicalLine, Canonicalizer, LineQualitySummary};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use document::{DocumentArtifact, DocumentMetadata, ProcessingStatus, ReviewStatus};
pub use error::{
    ConfigError, IntegrationError, InvoqError, NotifyError, PreprocessError, ProviderError,
    Result, StorageError,
};
pub use logging::init_logging;
pub use ocr::{classify, FailureClassification, OcrFailureCategory, OcrProvider};
pub use parsing::{parse_amount, FieldKind, ParsedAmount};
pub use pipeline::{
    Collaborators, EnrichedStatus, OcrPipeline, PipelineConfig, PipelineError, StartOutcome,
    VerificationEdits,
};
pub use reclaimer::{OrphanReclaimer, ReclaimReport, ReclaimScheduler};
pub use storage::BlobStore;
