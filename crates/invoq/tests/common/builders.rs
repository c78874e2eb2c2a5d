//! Builders for provider payloads and verification edits.

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;

use invoq::ocr::{ExtractedHeader, OcrDocument, RawLineItem};
use invoq::pipeline::{HeaderEdits, LineEdit, VerificationEdits};

pub const SUPPLIER: &str = "Acme Foods";

pub fn line(description: &str, quantity: &str, unit_price: &str, line_total: &str) -> RawLineItem {
    RawLineItem {
        description: description.to_string(),
        quantity: Some(quantity.to_string()),
        unit_price: Some(unit_price.to_string()),
        line_total: Some(line_total.to_string()),
        ..Default::default()
    }
}

/// Builder for a successful OCR payload.
pub struct InvoicePayloadBuilder {
    word_count: u32,
    confidence: f64,
    header: ExtractedHeader,
    lines: Vec<RawLineItem>,
}

impl InvoicePayloadBuilder {
    /// A clean two-line invoice from [`SUPPLIER`] at 97% confidence.
    pub fn new() -> Self {
        Self {
            word_count: 120,
            confidence: 97.0,
            header: ExtractedHeader {
                supplier_name: Some(SUPPLIER.to_string()),
                invoice_number: Some("INV-1001".to_string()),
                invoice_date: NaiveDate::from_ymd_opt(2026, 3, 14),
                currency: Some("usd".to_string()),
                subtotal: Some("120.00".to_string()),
                tax: Some("3.45".to_string()),
                total: Some("123.45".to_string()),
            },
            lines: vec![
                line("Prosciutto di Parma", "2", "45.00", "90.00"),
                line("Frozen Brontosaurus Ribs", "1", "30.00", "30.00"),
            ],
        }
    }

    pub fn word_count(mut self, word_count: u32) -> Self {
        self.word_count = word_count;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn supplier(mut self, name: Option<&str>) -> Self {
        self.header.supplier_name = name.map(str::to_string);
        self
    }

    pub fn total(mut self, total: &str) -> Self {
        self.header.total = Some(total.to_string());
        self
    }

    pub fn line(mut self, item: RawLineItem) -> Self {
        self.lines.push(item);
        self
    }

    pub fn build(self) -> OcrDocument {
        OcrDocument {
            word_count: self.word_count,
            confidence: self.confidence,
            header: self.header,
            line_items: self.lines,
        }
    }
}

/// Builder for manual verification edits.
#[derive(Default)]
pub struct EditsBuilder {
    header: HeaderEdits,
    lines: Vec<LineEdit>,
}

impl EditsBuilder {
    pub fn new() -> Self {
        Self {
            header: HeaderEdits {
                invoice_number: Some("INV-1001".to_string()),
                currency: Some("USD".to_string()),
                supplier_name: Some(SUPPLIER.to_string()),
                total: Some(Decimal::new(12345, 2)),
                ..Default::default()
            },
            lines: Vec::new(),
        }
    }

    pub fn total(mut self, total: Decimal) -> Self {
        self.header.total = Some(total);
        self
    }

    pub fn keep(mut self, id: &str, item: RawLineItem) -> Self {
        self.lines.push(LineEdit::existing(id, item));
        self
    }

    pub fn add(mut self, item: RawLineItem) -> Self {
        self.lines.push(LineEdit::added(item));
        self
    }

    pub fn build(self) -> VerificationEdits {
        VerificationEdits {
            header: self.header,
            lines: self.lines,
        }
    }
}
