//! Auto-approval decision engine.
//!
//! `evaluate` is pure: the pipeline gathers the inputs, evaluates once per
//! OCR completion and applies the decision in the same transaction that
//! persisted the invoice.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::canonical::LineQualitySummary;
use crate::integrations::SupplierStatus;

/// Default minimum OCR confidence for auto-approval.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 90.0;

/// Why an invoice cannot be auto-approved. Gates are checked in
/// declaration order and the first failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IneligibleReason {
    FeatureDisabled,
    AlreadyVerified,
    HasManualEdits,
    NoSupplier,
    SupplierNotTrusted,
    NoQualityData,
    NoLineItems,
    HasExcludedLines,
    LowConfidence,
    UnreadableTotal,
    NegativeTotal,
}

impl IneligibleReason {
    pub fn as_str(self) -> &'static str {
        match self {
            IneligibleReason::FeatureDisabled => "FEATURE_DISABLED",
            IneligibleReason::AlreadyVerified => "ALREADY_VERIFIED",
            IneligibleReason::HasManualEdits => "HAS_MANUAL_EDITS",
            IneligibleReason::NoSupplier => "NO_SUPPLIER",
            IneligibleReason::SupplierNotTrusted => "SUPPLIER_NOT_TRUSTED",
            IneligibleReason::NoQualityData => "NO_QUALITY_DATA",
            IneligibleReason::NoLineItems => "NO_LINE_ITEMS",
            IneligibleReason::HasExcludedLines => "HAS_EXCLUDED_LINES",
            IneligibleReason::LowConfidence => "LOW_CONFIDENCE",
            IneligibleReason::UnreadableTotal => "UNREADABLE_TOTAL",
            IneligibleReason::NegativeTotal => "NEGATIVE_TOTAL",
        }
    }
}

impl FromStr for IneligibleReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FEATURE_DISABLED" => Ok(IneligibleReason::FeatureDisabled),
            "ALREADY_VERIFIED" => Ok(IneligibleReason::AlreadyVerified),
            "HAS_MANUAL_EDITS" => Ok(IneligibleReason::HasManualEdits),
            "NO_SUPPLIER" => Ok(IneligibleReason::NoSupplier),
            "SUPPLIER_NOT_TRUSTED" => Ok(IneligibleReason::SupplierNotTrusted),
            "NO_QUALITY_DATA" => Ok(IneligibleReason::NoQualityData),
            "NO_LINE_ITEMS" => Ok(IneligibleReason::NoLineItems),
            "HAS_EXCLUDED_LINES" => Ok(IneligibleReason::HasExcludedLines),
            "LOW_CONFIDENCE" => Ok(IneligibleReason::LowConfidence),
            "UNREADABLE_TOTAL" => Ok(IneligibleReason::UnreadableTotal),
            "NEGATIVE_TOTAL" => Ok(IneligibleReason::NegativeTotal),
            other => Err(format!("unknown ineligible reason '{}'", other)),
        }
    }
}

impl std::fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoApprovalDecision {
    Eligible,
    Ineligible(IneligibleReason),
}

impl AutoApprovalDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, AutoApprovalDecision::Eligible)
    }
}

/// Everything the gates look at.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalInput {
    /// Location feature flag.
    pub auto_approve_enabled: bool,
    pub already_verified: bool,
    /// Any legacy line edited by a human.
    pub has_manual_edits: bool,
    pub supplier_status: Option<SupplierStatus>,
    /// Absent when no canonical rows exist yet.
    pub line_quality: Option<LineQualitySummary>,
    /// Mean OCR confidence (0-100).
    pub confidence: Option<f64>,
    pub total: Option<Decimal>,
    /// A total was printed but did not parse; its sign is unknown.
    pub total_unreadable: bool,
}

pub fn evaluate(input: &ApprovalInput, min_confidence: f64) -> AutoApprovalDecision {
    use AutoApprovalDecision::Ineligible;
    use IneligibleReason::*;

    if !input.auto_approve_enabled {
        return Ineligible(FeatureDisabled);
    }
    if input.already_verified {
        return Ineligible(AlreadyVerified);
    }
    if input.has_manual_edits {
        return Ineligible(HasManualEdits);
    }
    let Some(supplier_status) = input.supplier_status else {
        return Ineligible(NoSupplier);
    };
    if supplier_status != SupplierStatus::Active {
        return Ineligible(SupplierNotTrusted);
    }
    let Some(quality) = input.line_quality else {
        return Ineligible(NoQualityData);
    };
    if quality.total_lines == 0 {
        return Ineligible(NoLineItems);
    }
    if quality.warn_lines > 0 {
        return Ineligible(HasExcludedLines);
    }
    if quality.manual_edits > 0 {
        return Ineligible(HasManualEdits);
    }
    if input.confidence.map_or(true, |c| c < min_confidence) {
        return Ineligible(LowConfidence);
    }
    if input.total.is_none() && input.total_unreadable {
        return Ineligible(UnreadableTotal);
    }
    if input.total.is_some_and(|t| t.is_sign_negative() && !t.is_zero()) {
        return Ineligible(NegativeTotal);
    }

    AutoApprovalDecision::Eligible
}
