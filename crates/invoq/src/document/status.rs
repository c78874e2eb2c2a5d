//! Lifecycle states stored on a document.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// OCR processing state.
///
/// `PENDING_OCR -> OCR_PROCESSING -> {OCR_COMPLETE, OCR_FAILED}`, then
/// `OCR_COMPLETE -> MANUALLY_UPDATED` through manual verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    PendingOcr,
    OcrProcessing,
    OcrComplete,
    OcrFailed,
    ManuallyUpdated,
}

impl ProcessingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStatus::PendingOcr => "PENDING_OCR",
            ProcessingStatus::OcrProcessing => "OCR_PROCESSING",
            ProcessingStatus::OcrComplete => "OCR_COMPLETE",
            ProcessingStatus::OcrFailed => "OCR_FAILED",
            ProcessingStatus::ManuallyUpdated => "MANUALLY_UPDATED",
        }
    }

    /// States from which a provider job may be started.
    pub fn can_start(self) -> bool {
        matches!(
            self,
            ProcessingStatus::PendingOcr | ProcessingStatus::OcrFailed
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessingStatus::OcrComplete
                | ProcessingStatus::OcrFailed
                | ProcessingStatus::ManuallyUpdated
        )
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_OCR" => Ok(ProcessingStatus::PendingOcr),
            "OCR_PROCESSING" => Ok(ProcessingStatus::OcrProcessing),
            "OCR_COMPLETE" => Ok(ProcessingStatus::OcrComplete),
            "OCR_FAILED" => Ok(ProcessingStatus::OcrFailed),
            "MANUALLY_UPDATED" => Ok(ProcessingStatus::ManuallyUpdated),
            other => Err(format!("unknown processing status '{}'", other)),
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human review state, independent of OCR processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    None,
    NeedsReview,
    Verified,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::None => "NONE",
            ReviewStatus::NeedsReview => "NEEDS_REVIEW",
            ReviewStatus::Verified => "VERIFIED",
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(ReviewStatus::None),
            "NEEDS_REVIEW" => Ok(ReviewStatus::NeedsReview),
            "VERIFIED" => Ok(ReviewStatus::Verified),
            other => Err(format!("unknown review status '{}'", other)),
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who verified an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationSource {
    Auto,
    Manual,
}

impl VerificationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationSource::Auto => "AUTO",
            VerificationSource::Manual => "MANUAL",
        }
    }
}

impl FromStr for VerificationSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO" => Ok(VerificationSource::Auto),
            "MANUAL" => Ok(VerificationSource::Manual),
            other => Err(format!("unknown verification source '{}'", other)),
        }
    }
}

impl std::fmt::Display for VerificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
