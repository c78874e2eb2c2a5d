//! The OCR job state machine.
//!
//! [`OcrPipeline`] owns every transition of a document's processing state.
//! Transitions are conditional writes guarded by the
//! `(status, attempt_count, job_id)` version tuple, see
//! [`document_repo::compare_and_set`](crate::db::document_repo::compare_and_set).

pub mod config;
pub mod edits;
pub mod enriched;
pub mod error;
pub mod runner;

pub use config::PipelineConfig;
pub use edits::{HeaderEdits, LineEdit, VerificationEdits};
pub use enriched::{EnrichedStatus, StartOutcome};
pub use error::PipelineError;
pub use runner::{Collaborators, OcrPipeline};
