//! Canonical, analytics-safe representation of invoice lines.
//!
//! Canonical rows are rebuilt from scratch on every (re)verification and
//! replace the previous set wholesale.

pub mod canonicalizer;
pub mod units;

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::quality::{QualityStatus, WarnReasons};

pub use canonicalizer::{Canonicalizer, LineInput};
pub use units::{detect_unit, UnitCategory, UnitInfo};

/// Pointer from a canonical line back to the line it was built from.
///
/// Manually verified lines point at the persisted legacy row; OCR output
/// points at its zero-based position in the provider payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SourceLineRef {
    LegacyId(String),
    Position(usize),
}

impl std::fmt::Display for SourceLineRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLineRef::LegacyId(id) => write!(f, "id:{}", id),
            SourceLineRef::Position(index) => write!(f, "line:{}", index),
        }
    }
}

impl FromStr for SourceLineRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix("id:").filter(|id| !id.is_empty()) {
            return Ok(SourceLineRef::LegacyId(id.to_string()));
        }
        if let Some(index) = s.strip_prefix("line:") {
            return index
                .parse()
                .map(SourceLineRef::Position)
                .map_err(|_| format!("invalid line position in '{}'", s));
        }
        Err(format!("invalid source line ref '{}'", s))
    }
}

impl From<SourceLineRef> for String {
    fn from(value: SourceLineRef) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for SourceLineRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentStatus {
    None,
    Modified,
}

impl AdjustmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AdjustmentStatus::None => "NONE",
            AdjustmentStatus::Modified => "MODIFIED",
        }
    }
}

impl FromStr for AdjustmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(AdjustmentStatus::None),
            "MODIFIED" => Ok(AdjustmentStatus::Modified),
            other => Err(format!("unknown adjustment status '{}'", other)),
        }
    }
}

/// Parsed amount with its 2-decimal display form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalAmount {
    pub value: Option<Decimal>,
    pub display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLine {
    pub source_line_ref: SourceLineRef,
    pub raw_description: String,
    pub normalized_description: String,
    pub comparison_key: String,
    pub unit: Option<UnitInfo>,
    pub quantity: CanonicalAmount,
    pub unit_price: CanonicalAmount,
    pub line_total: CanonicalAmount,
    pub currency: Option<String>,
    pub quality_status: QualityStatus,
    pub warn_reasons: WarnReasons,
    pub adjustment_status: AdjustmentStatus,
}

impl CanonicalLine {
    pub fn is_warn(&self) -> bool {
        self.quality_status == QualityStatus::Warn
    }
}

/// Line counts the auto-approval gates read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineQualitySummary {
    pub total_lines: u32,
    /// Lines excluded from analytics (quality WARN).
    pub warn_lines: u32,
    pub manual_edits: u32,
}

impl LineQualitySummary {
    pub fn from_lines(lines: &[CanonicalLine]) -> Self {
        Self {
            total_lines: lines.len() as u32,
            warn_lines: lines.iter().filter(|l| l.is_warn()).count() as u32,
            manual_edits: lines
                .iter()
                .filter(|l| l.adjustment_status == AdjustmentStatus::Modified)
                .count() as u32,
        }
    }
}
