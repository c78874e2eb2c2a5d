//! Provider payloads, parsed at the boundary into typed results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of polling a provider job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OcrJobResult {
    InProgress,
    Succeeded(OcrDocument),
    Failed {
        #[serde(default)]
        error: Option<ProviderFailure>,
        #[serde(default)]
        confidence: Option<f64>,
        #[serde(default)]
        word_count: Option<u32>,
    },
}

/// Error code and message as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ProviderFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.message.is_none()
    }
}

/// A successfully analyzed invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrDocument {
    #[serde(default)]
    pub word_count: u32,
    /// Mean word confidence, 0-100.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub header: ExtractedHeader,
    #[serde(default)]
    pub line_items: Vec<RawLineItem>,
}

/// Header fields. Amounts stay raw until the money parser sees them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedHeader {
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub subtotal: Option<String>,
    #[serde(default)]
    pub tax: Option<String>,
    #[serde(default)]
    pub total: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub unit_price: Option<String>,
    #[serde(default)]
    pub line_total: Option<String>,
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}
