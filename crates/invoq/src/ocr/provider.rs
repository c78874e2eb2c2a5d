use async_trait::async_trait;

use crate::error::ProviderError;

use super::payload::{OcrJobResult, ProviderFailure};

/// A request to analyze one stored asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrJobRequest {
    /// Blob key of the asset to analyze (original or derived).
    pub key: String,
    pub mime_type: String,
    /// Ask the provider to deskew pages itself.
    pub native_deskew: bool,
}

/// Asynchronous OCR/document-analysis service.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Submits a job and returns the provider's job id.
    async fn start_job(&self, request: &OcrJobRequest) -> Result<String, ProviderError>;

    async fn get_job_result(&self, job_id: &str) -> Result<OcrJobResult, ProviderError>;
}

impl ProviderError {
    /// Code/message pair for failure classification.
    pub fn to_failure(&self) -> ProviderFailure {
        match self {
            ProviderError::Rejected { code, message } => ProviderFailure::new(code, message),
            ProviderError::Status { status, body } => {
                ProviderFailure::new(format!("HTTP{}", status), body)
            }
            ProviderError::Request(message) => ProviderFailure {
                code: None,
                message: Some(message.clone()),
            },
            ProviderError::Decode(message) => ProviderFailure {
                code: Some("MalformedResponse".to_string()),
                message: Some(message.clone()),
            },
        }
    }
}
