//! OCR provider contract, payload types and failure classification.

pub mod classifier;
pub mod http;
pub mod payload;
pub mod provider;

pub use classifier::{classify, FailureClassification, FallbackHint, OcrFailureCategory};
pub use http::HttpOcrProvider;
pub use payload::{ExtractedHeader, OcrDocument, OcrJobResult, ProviderFailure, RawLineItem};
pub use provider::{OcrJobRequest, OcrProvider};
