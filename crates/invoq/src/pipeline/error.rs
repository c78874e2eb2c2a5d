use thiserror::Error;

use crate::document::ProcessingStatus;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Document {0} is deleted")]
    Deleted(String),

    #[error("Cannot {operation} document {id} in state {status}")]
    InvalidState {
        id: String,
        status: ProcessingStatus,
        operation: &'static str,
    },

    #[error("OCR attempts exhausted ({attempts} of {max} used)")]
    AttemptsExhausted { attempts: u32, max: u32 },

    #[error("Document {0} changed concurrently")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage failed: {0}")]
    Storage(#[from] crate::error::StorageError),

    #[error("Database operation failed: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Integration failed: {0}")]
    Integration(#[from] crate::error::IntegrationError),

    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] crate::error::PreprocessError),

    #[error("OCR provider failed: {0}")]
    Provider(#[from] crate::error::ProviderError),
}

impl PipelineError {
    pub(crate) fn document_not_found(id: &str) -> Self {
        PipelineError::NotFound {
            kind: "Document",
            id: id.to_string(),
        }
    }
}
