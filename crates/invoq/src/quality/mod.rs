//! Text-quality heuristics for spotting OCR misreads in line descriptions.

pub mod allowlist;
pub mod dictionary;
pub mod heuristics;

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use dictionary::Dictionary;
pub use heuristics::description_warnings;

/// Reason a canonical line was downgraded to WARN.
///
/// Declaration order is the reporting order; reasons are kept in a
/// `BTreeSet` so they stay deduplicated and stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarnReason {
    LowAlphaRatio,
    NoVowelToken,
    OcrNoise,
    Gibberish,
    ConsonantCluster,
    PossibleTypo,
    AmbiguousAmount,
    InvalidAmount,
}

impl WarnReason {
    pub fn as_str(self) -> &'static str {
        match self {
            WarnReason::LowAlphaRatio => "LOW_ALPHA_RATIO",
            WarnReason::NoVowelToken => "NO_VOWEL_TOKEN",
            WarnReason::OcrNoise => "OCR_NOISE",
            WarnReason::Gibberish => "GIBBERISH",
            WarnReason::ConsonantCluster => "CONSONANT_CLUSTER",
            WarnReason::PossibleTypo => "POSSIBLE_TYPO",
            WarnReason::AmbiguousAmount => "AMBIGUOUS_AMOUNT",
            WarnReason::InvalidAmount => "INVALID_AMOUNT",
        }
    }
}

impl FromStr for WarnReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW_ALPHA_RATIO" => Ok(WarnReason::LowAlphaRatio),
            "NO_VOWEL_TOKEN" => Ok(WarnReason::NoVowelToken),
            "OCR_NOISE" => Ok(WarnReason::OcrNoise),
            "GIBBERISH" => Ok(WarnReason::Gibberish),
            "CONSONANT_CLUSTER" => Ok(WarnReason::ConsonantCluster),
            "POSSIBLE_TYPO" => Ok(WarnReason::PossibleTypo),
            "AMBIGUOUS_AMOUNT" => Ok(WarnReason::AmbiguousAmount),
            "INVALID_AMOUNT" => Ok(WarnReason::InvalidAmount),
            other => Err(format!("unknown warn reason '{}'", other)),
        }
    }
}

impl std::fmt::Display for WarnReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, deduplicated set of warn reasons.
pub type WarnReasons = BTreeSet<WarnReason>;

/// Whether a canonical line is trusted for analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityStatus {
    Ok,
    Warn,
}

impl QualityStatus {
    pub fn from_reasons(reasons: &WarnReasons) -> Self {
        if reasons.is_empty() {
            QualityStatus::Ok
        } else {
            QualityStatus::Warn
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityStatus::Ok => "OK",
            QualityStatus::Warn => "WARN",
        }
    }
}

impl FromStr for QualityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(QualityStatus::Ok),
            "WARN" => Ok(QualityStatus::Warn),
            other => Err(format!("unknown quality status '{}'", other)),
        }
    }
}
