//! Maps provider failures and weak OCR output to stable failure categories.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::payload::ProviderFailure;

/// Documents with fewer words than this are not invoices.
pub const MIN_WORD_COUNT: u32 = 5;
/// Mean confidence (0-100) below which output is unusable.
pub const MIN_CONFIDENCE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OcrFailureCategory {
    NotADocument,
    ProviderTimeout,
    DocumentTypeMismatch,
    Blurry,
    LowResolution,
    ProviderError,
    Unknown,
}

impl OcrFailureCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            OcrFailureCategory::NotADocument => "NOT_A_DOCUMENT",
            OcrFailureCategory::ProviderTimeout => "PROVIDER_TIMEOUT",
            OcrFailureCategory::DocumentTypeMismatch => "DOCUMENT_TYPE_MISMATCH",
            OcrFailureCategory::Blurry => "BLURRY",
            OcrFailureCategory::LowResolution => "LOW_RESOLUTION",
            OcrFailureCategory::ProviderError => "PROVIDER_ERROR",
            OcrFailureCategory::Unknown => "UNKNOWN",
        }
    }

    /// Stable, user-facing explanation.
    pub fn detail(self) -> &'static str {
        match self {
            OcrFailureCategory::NotADocument => {
                "The upload does not look like an invoice: too little readable text was found."
            }
            OcrFailureCategory::ProviderTimeout => {
                "The OCR service was busy or did not answer in time."
            }
            OcrFailureCategory::DocumentTypeMismatch => {
                "The file type or layout is not supported for invoice extraction."
            }
            OcrFailureCategory::Blurry => "The image is too blurry to read.",
            OcrFailureCategory::LowResolution => "The image resolution is too low to read.",
            OcrFailureCategory::ProviderError => "The OCR service reported an error.",
            OcrFailureCategory::Unknown => "OCR failed for an unknown reason.",
        }
    }

    pub fn fallback_hint(self) -> FallbackHint {
        match self {
            OcrFailureCategory::ProviderTimeout
            | OcrFailureCategory::ProviderError
            | OcrFailureCategory::Unknown => FallbackHint::Retry,
            OcrFailureCategory::Blurry | OcrFailureCategory::LowResolution => FallbackHint::Rescan,
            OcrFailureCategory::NotADocument | OcrFailureCategory::DocumentTypeMismatch => {
                FallbackHint::ManualEntry
            }
        }
    }
}

impl FromStr for OcrFailureCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_A_DOCUMENT" => Ok(OcrFailureCategory::NotADocument),
            "PROVIDER_TIMEOUT" => Ok(OcrFailureCategory::ProviderTimeout),
            "DOCUMENT_TYPE_MISMATCH" => Ok(OcrFailureCategory::DocumentTypeMismatch),
            "BLURRY" => Ok(OcrFailureCategory::Blurry),
            "LOW_RESOLUTION" => Ok(OcrFailureCategory::LowResolution),
            "PROVIDER_ERROR" => Ok(OcrFailureCategory::ProviderError),
            "UNKNOWN" => Ok(OcrFailureCategory::Unknown),
            other => Err(format!("unknown failure category '{}'", other)),
        }
    }
}

impl std::fmt::Display for OcrFailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user should try next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackHint {
    Retry,
    Rescan,
    ManualEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureClassification {
    pub category: OcrFailureCategory,
    pub detail: String,
    pub hint: FallbackHint,
}

impl FailureClassification {
    pub fn new(category: OcrFailureCategory) -> Self {
        Self {
            category,
            detail: category.detail().to_string(),
            hint: category.fallback_hint(),
        }
    }
}

/// True when a successful analysis is too thin to be an invoice.
pub fn is_not_a_document(word_count: Option<u32>, confidence: Option<f64>) -> bool {
    word_count.is_some_and(|w| w < MIN_WORD_COUNT) || confidence.is_some_and(|c| c < MIN_CONFIDENCE)
}

/// Classifies a failed or rejected OCR job.
///
/// Output-quality signals win over provider error codes: a job that read
/// two words is not a document, whatever else the provider said.
pub fn classify(
    error: Option<&ProviderFailure>,
    confidence: Option<f64>,
    word_count: Option<u32>,
) -> FailureClassification {
    if is_not_a_document(word_count, confidence) {
        return FailureClassification::new(OcrFailureCategory::NotADocument);
    }

    let Some(error) = error.filter(|e| !e.is_empty()) else {
        return FailureClassification::new(OcrFailureCategory::Unknown);
    };

    FailureClassification::new(category_for(error))
}

fn category_for(error: &ProviderFailure) -> OcrFailureCategory {
    let code = error.code.as_deref().unwrap_or_default().to_lowercase();
    let message = error.message.as_deref().unwrap_or_default().to_lowercase();
    let mentions = |needle: &str| code.contains(needle) || message.contains(needle);

    if mentions("throttl")
        || mentions("throughput")
        || mentions("limitexceeded")
        || mentions("rate limit")
        || mentions("ratelimit")
        || mentions("timeout")
        || mentions("timed out")
    {
        OcrFailureCategory::ProviderTimeout
    } else if mentions("invalidparameter")
        || mentions("unsupported")
        || mentions("baddocument")
        || mentions("invalid document")
    {
        OcrFailureCategory::DocumentTypeMismatch
    } else if mentions("blur") {
        OcrFailureCategory::Blurry
    } else if mentions("resolution") || mentions("too small") {
        OcrFailureCategory::LowResolution
    } else {
        OcrFailureCategory::ProviderError
    }
}
