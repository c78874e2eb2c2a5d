//! Locale-tolerant parsing of numeric strings read off invoices.
//!
//! OCR output mixes European (`1.234,56`) and Anglo (`1,234.56`) grouping,
//! accounting negatives (`(79,10)`) and stray currency markers. The parser
//! never guesses silently: when a string is genuinely ambiguous for the field
//! it belongs to, it returns no value and says why.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// The invoice field a raw string was read from.
///
/// Ambiguity rules depend on it: unit prices legitimately carry 3–4 decimal
/// digits while totals never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKind {
    Quantity,
    UnitPrice,
    LineTotal,
    Discount,
    Tax,
    Subtotal,
    InvoiceTotal,
}

impl FieldKind {
    /// Totals, discounts and taxes are money amounts with at most 2 decimals.
    pub fn is_total_class(self) -> bool {
        matches!(
            self,
            FieldKind::LineTotal
                | FieldKind::Discount
                | FieldKind::Tax
                | FieldKind::Subtotal
                | FieldKind::InvoiceTotal
        )
    }

    /// Maximum number of decimal digits accepted for this field.
    fn max_decimals(self) -> usize {
        if self.is_total_class() {
            2
        } else {
            4
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseConfidence {
    High,
    Low,
}

/// Why a string produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseIssue {
    AmbiguousDecimalSeparator,
    InvalidFormat,
}

impl ParseIssue {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseIssue::AmbiguousDecimalSeparator => "AMBIGUOUS_DECIMAL_SEPARATOR",
            ParseIssue::InvalidFormat => "INVALID_FORMAT",
        }
    }
}

/// Result of parsing one numeric field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAmount {
    /// Full-precision value. Never rounded.
    pub value: Option<Decimal>,
    /// Value rounded half-away-from-zero to exactly two decimals.
    pub display: Option<String>,
    pub confidence: ParseConfidence,
    pub issue: Option<ParseIssue>,
}

impl ParsedAmount {
    fn parsed(value: Decimal) -> Self {
        Self {
            value: Some(value),
            display: Some(display_rounded(value)),
            confidence: ParseConfidence::High,
            issue: None,
        }
    }

    fn rejected(issue: ParseIssue) -> Self {
        Self {
            value: None,
            display: None,
            confidence: ParseConfidence::Low,
            issue: Some(issue),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.value.is_some()
    }
}

/// Formats a value with exactly two decimals for display.
pub fn display_rounded(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// Parses a raw numeric string for the given field.
pub fn parse_amount(raw: &str, kind: FieldKind) -> ParsedAmount {
    let (negative, body) = match strip_sign(raw) {
        Some(parts) => parts,
        None => return ParsedAmount::rejected(ParseIssue::InvalidFormat),
    };

    // Currency markers may only wrap the number; grouping whitespace and
    // apostrophes may appear inside it.
    let cleaned: String = body
        .trim_matches(is_ignorable)
        .chars()
        .filter(|c| !is_inner_grouping(*c))
        .collect();

    if cleaned.is_empty()
        || !cleaned.chars().any(|c| c.is_ascii_digit())
        || !cleaned
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return ParsedAmount::rejected(ParseIssue::InvalidFormat);
    }

    let normalized = match normalize_separators(&cleaned, kind) {
        Ok(normalized) => normalized,
        Err(issue) => return ParsedAmount::rejected(issue),
    };

    match Decimal::from_str(&normalized) {
        Ok(value) if negative => ParsedAmount::parsed(-value),
        Ok(value) => ParsedAmount::parsed(value),
        Err(_) => ParsedAmount::rejected(ParseIssue::InvalidFormat),
    }
}

/// Splits off accounting negatives: `(12.00)`, `-12.00` and `12.00-`.
///
/// Returns `None` for unbalanced parentheses.
fn strip_sign(raw: &str) -> Option<(bool, &str)> {
    let trimmed = raw.trim();
    let opens = trimmed.starts_with('(');
    let closes = trimmed.ends_with(')');

    if opens != closes {
        return None;
    }
    if opens {
        let inner = &trimmed[1..trimmed.len() - 1];
        return Some((true, inner.trim()));
    }

    // Currency symbols may precede the minus sign ("$-12.00").
    let without_prefix = trimmed.trim_start_matches(is_ignorable);
    if let Some(rest) = without_prefix.strip_prefix('-') {
        return Some((true, rest));
    }
    if let Some(rest) = trimmed.strip_suffix('-') {
        return Some((true, rest));
    }
    Some((false, trimmed))
}

/// Characters that carry no numeric meaning: currency symbols and codes,
/// whitespace and apostrophe grouping.
fn is_ignorable(c: char) -> bool {
    c.is_whitespace()
        || c.is_alphabetic()
        || matches!(c, '$' | '€' | '£' | '¥' | '₹' | '₩' | '₽' | '\'' | '’')
}

fn is_inner_grouping(c: char) -> bool {
    c.is_whitespace() || matches!(c, '\'' | '’')
}

/// Rewrites a digits-and-separators string into `Decimal`'s plain format.
fn normalize_separators(cleaned: &str, kind: FieldKind) -> Result<String, ParseIssue> {
    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();

    match (dots, commas) {
        (0, 0) => Ok(cleaned.to_string()),
        (d, c) if d > 0 && c > 0 => normalize_mixed(cleaned, kind),
        _ => {
            let separator = if dots > 0 { '.' } else { ',' };
            let count = dots.max(commas);
            if count == 1 {
                normalize_single(cleaned, separator, kind)
            } else {
                normalize_grouping(cleaned, separator)
            }
        }
    }
}

/// Both separators present: the one appearing last is the decimal point.
fn normalize_mixed(cleaned: &str, kind: FieldKind) -> Result<String, ParseIssue> {
    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let (decimal, grouping) = if last_dot > last_comma {
        ('.', ',')
    } else {
        (',', '.')
    };

    if cleaned.matches(decimal).count() != 1 {
        return Err(ParseIssue::InvalidFormat);
    }

    let (integer_part, fraction) = cleaned
        .split_once(decimal)
        .ok_or(ParseIssue::InvalidFormat)?;

    if fraction.is_empty() || fraction.len() > kind.max_decimals() {
        return Err(ParseIssue::InvalidFormat);
    }

    let integer = normalize_grouping(integer_part, grouping)?;
    Ok(format!("{}.{}", integer, fraction))
}

/// Exactly one separator occurrence: decimal point or thousands grouping
/// depending on the trailing digit count and the field.
fn normalize_single(cleaned: &str, separator: char, kind: FieldKind) -> Result<String, ParseIssue> {
    let (integer, fraction) = cleaned
        .split_once(separator)
        .ok_or(ParseIssue::InvalidFormat)?;

    if fraction.is_empty() {
        return Err(ParseIssue::InvalidFormat);
    }
    if integer.is_empty() {
        // ".50" / ",50"
        return if fraction.len() <= kind.max_decimals() {
            Ok(format!("0.{}", fraction))
        } else {
            Err(ParseIssue::InvalidFormat)
        };
    }

    match fraction.len() {
        1 | 2 => Ok(format!("{}.{}", integer, fraction)),
        3 if separator == ',' => {
            if integer.len() <= 3 {
                Ok(format!("{}{}", integer, fraction))
            } else {
                Err(ParseIssue::InvalidFormat)
            }
        }
        3 if kind.is_total_class() => Err(ParseIssue::AmbiguousDecimalSeparator),
        n if n <= kind.max_decimals() => Ok(format!("{}.{}", integer, fraction)),
        _ => Err(ParseIssue::InvalidFormat),
    }
}

/// Validates `1.234.567`-style grouping and strips the separators.
fn normalize_grouping(value: &str, separator: char) -> Result<String, ParseIssue> {
    if !value.contains(separator) {
        return if value.is_empty() {
            Err(ParseIssue::InvalidFormat)
        } else {
            Ok(value.to_string())
        };
    }

    let mut groups = value.split(separator);
    let head = groups.next().unwrap_or_default();
    if head.is_empty() || head.len() > 3 {
        return Err(ParseIssue::InvalidFormat);
    }

    let mut digits = head.to_string();
    for group in groups {
        if group.len() != 3 {
            return Err(ParseIssue::InvalidFormat);
        }
        digits.push_str(group);
    }
    Ok(digits)
}
