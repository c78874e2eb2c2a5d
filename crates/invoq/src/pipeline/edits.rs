//! Human corrections submitted through manual verification.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ocr::RawLineItem;

/// The full corrected header. Replaces the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderEdits {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub supplier_name: Option<String>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub total: Option<Decimal>,
}

/// One line of the corrected invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEdit {
    /// Existing legacy line being kept or changed; `None` adds a line.
    pub id: Option<String>,
    pub item: RawLineItem,
}

impl LineEdit {
    pub fn existing(id: impl Into<String>, item: RawLineItem) -> Self {
        Self {
            id: Some(id.into()),
            item,
        }
    }

    pub fn added(item: RawLineItem) -> Self {
        Self { id: None, item }
    }
}

/// Header plus the complete line list. Lines left out are removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationEdits {
    pub header: HeaderEdits,
    pub lines: Vec<LineEdit>,
}
