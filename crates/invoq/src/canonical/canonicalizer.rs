use std::sync::Arc;

use crate::ocr::RawLineItem;
use crate::parsing::{parse_amount, FieldKind, ParseIssue};
use crate::quality::{description_warnings, Dictionary, QualityStatus, WarnReason, WarnReasons};

use super::units::detect_unit;
use super::{AdjustmentStatus, CanonicalAmount, CanonicalLine, SourceLineRef};

/// One raw line plus where it came from.
#[derive(Debug, Clone)]
pub struct LineInput<'a> {
    pub source: SourceLineRef,
    pub item: &'a RawLineItem,
    /// Edited or added by a human.
    pub modified: bool,
}

/// Builds canonical lines. Holds the shared spell-check dictionary.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    dictionary: Arc<Dictionary>,
}

impl Canonicalizer {
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self { dictionary }
    }

    /// Canonicalizes provider output; refs are positional.
    pub fn canonicalize_ocr_lines(
        &self,
        items: &[RawLineItem],
        header_currency: Option<&str>,
    ) -> Vec<CanonicalLine> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.canonicalize_line(
                    LineInput {
                        source: SourceLineRef::Position(index),
                        item,
                        modified: false,
                    },
                    header_currency,
                )
            })
            .collect()
    }

    pub fn canonicalize_line(
        &self,
        input: LineInput<'_>,
        header_currency: Option<&str>,
    ) -> CanonicalLine {
        let item = input.item;
        let normalized_description = normalize_description(&item.description);
        let comparison_key = normalized_description.to_lowercase();

        let mut reasons = description_warnings(&normalized_description, &self.dictionary);

        let quantity = parse_field(item.quantity.as_deref(), FieldKind::Quantity, None);
        let unit_price = parse_field(
            item.unit_price.as_deref(),
            FieldKind::UnitPrice,
            Some(&mut reasons),
        );
        let line_total = parse_field(
            item.line_total.as_deref(),
            FieldKind::LineTotal,
            Some(&mut reasons),
        );

        let currency = normalize_currency(item.currency.as_deref())
            .or_else(|| normalize_currency(header_currency));

        CanonicalLine {
            source_line_ref: input.source,
            raw_description: item.description.clone(),
            unit: detect_unit(item.unit.as_deref(), &normalized_description),
            normalized_description,
            comparison_key,
            quantity,
            unit_price,
            line_total,
            currency,
            quality_status: QualityStatus::from_reasons(&reasons),
            warn_reasons: reasons,
            adjustment_status: if input.modified {
                AdjustmentStatus::Modified
            } else {
                AdjustmentStatus::None
            },
        }
    }
}

/// Collapses whitespace runs and trims.
pub fn normalize_description(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_currency(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
}

/// Parses an optional field. Blank fields are absent, not invalid.
fn parse_field(
    raw: Option<&str>,
    kind: FieldKind,
    reasons: Option<&mut WarnReasons>,
) -> CanonicalAmount {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return CanonicalAmount::default();
    };

    let parsed = parse_amount(raw, kind);
    if let (Some(issue), Some(reasons)) = (parsed.issue, reasons) {
        reasons.insert(match issue {
            ParseIssue::AmbiguousDecimalSeparator => WarnReason::AmbiguousAmount,
            ParseIssue::InvalidFormat => WarnReason::InvalidAmount,
        });
    }

    CanonicalAmount {
        value: parsed.value,
        display: parsed.display,
    }
}
