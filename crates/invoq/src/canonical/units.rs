//! Unit-of-measure detection from unit fields and description text.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitCategory {
    Weight,
    Volume,
    Count,
    Package,
}

impl UnitCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitCategory::Weight => "WEIGHT",
            UnitCategory::Volume => "VOLUME",
            UnitCategory::Count => "COUNT",
            UnitCategory::Package => "PACKAGE",
        }
    }
}

impl FromStr for UnitCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WEIGHT" => Ok(UnitCategory::Weight),
            "VOLUME" => Ok(UnitCategory::Volume),
            "COUNT" => Ok(UnitCategory::Count),
            "PACKAGE" => Ok(UnitCategory::Package),
            other => Err(format!("unknown unit category '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub label: String,
    pub category: UnitCategory,
}

/// (alias, canonical label, category)
const UNIT_ALIASES: &[(&str, &str, UnitCategory)] = &[
    ("kg", "kg", UnitCategory::Weight),
    ("kgs", "kg", UnitCategory::Weight),
    ("kilo", "kg", UnitCategory::Weight),
    ("kilos", "kg", UnitCategory::Weight),
    ("g", "g", UnitCategory::Weight),
    ("gr", "g", UnitCategory::Weight),
    ("gram", "g", UnitCategory::Weight),
    ("grams", "g", UnitCategory::Weight),
    ("lb", "lb", UnitCategory::Weight),
    ("lbs", "lb", UnitCategory::Weight),
    ("pound", "lb", UnitCategory::Weight),
    ("pounds", "lb", UnitCategory::Weight),
    ("oz", "oz", UnitCategory::Weight),
    ("l", "l", UnitCategory::Volume),
    ("lt", "l", UnitCategory::Volume),
    ("ltr", "l", UnitCategory::Volume),
    ("liter", "l", UnitCategory::Volume),
    ("liters", "l", UnitCategory::Volume),
    ("litre", "l", UnitCategory::Volume),
    ("litres", "l", UnitCategory::Volume),
    ("ml", "ml", UnitCategory::Volume),
    ("cl", "cl", UnitCategory::Volume),
    ("gal", "gal", UnitCategory::Volume),
    ("gallon", "gal", UnitCategory::Volume),
    ("gallons", "gal", UnitCategory::Volume),
    ("qt", "qt", UnitCategory::Volume),
    ("quart", "qt", UnitCategory::Volume),
    ("pt", "pt", UnitCategory::Volume),
    ("pint", "pt", UnitCategory::Volume),
    ("floz", "fl oz", UnitCategory::Volume),
    ("ea", "each", UnitCategory::Count),
    ("each", "each", UnitCategory::Count),
    ("pc", "each", UnitCategory::Count),
    ("pcs", "each", UnitCategory::Count),
    ("piece", "each", UnitCategory::Count),
    ("pieces", "each", UnitCategory::Count),
    ("unit", "each", UnitCategory::Count),
    ("units", "each", UnitCategory::Count),
    ("ct", "count", UnitCategory::Count),
    ("count", "count", UnitCategory::Count),
    ("dz", "dozen", UnitCategory::Count),
    ("doz", "dozen", UnitCategory::Count),
    ("dozen", "dozen", UnitCategory::Count),
    ("cs", "case", UnitCategory::Package),
    ("case", "case", UnitCategory::Package),
    ("cases", "case", UnitCategory::Package),
    ("bx", "box", UnitCategory::Package),
    ("box", "box", UnitCategory::Package),
    ("boxes", "box", UnitCategory::Package),
    ("pk", "pack", UnitCategory::Package),
    ("pack", "pack", UnitCategory::Package),
    ("pkg", "pack", UnitCategory::Package),
    ("bag", "bag", UnitCategory::Package),
    ("bags", "bag", UnitCategory::Package),
    ("btl", "bottle", UnitCategory::Package),
    ("bottle", "bottle", UnitCategory::Package),
    ("bottles", "bottle", UnitCategory::Package),
    ("can", "can", UnitCategory::Package),
    ("cans", "can", UnitCategory::Package),
    ("ctn", "carton", UnitCategory::Package),
    ("carton", "carton", UnitCategory::Package),
    ("tray", "tray", UnitCategory::Package),
    ("tub", "tub", UnitCategory::Package),
    ("jar", "jar", UnitCategory::Package),
];

/// Number immediately followed by a unit: `40lb`, `1 gal`, `2.5 kg`.
static RE_QUANTIFIED_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d(?:[.,]?\d)*\s*(fl\.?\s?oz|[a-z]+)\b").unwrap());

fn lookup(alias: &str) -> Option<UnitInfo> {
    let normalized: String = alias
        .trim()
        .trim_end_matches('.')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_lowercase();

    UNIT_ALIASES
        .iter()
        .find(|(a, _, _)| *a == normalized)
        .map(|(_, label, category)| UnitInfo {
            label: label.to_string(),
            category: *category,
        })
}

/// Resolves a unit from the explicit unit field, else from the description.
///
/// Bare description words only match aliases of three or more letters so
/// stray single letters ("g", "l") are not read as units.
pub fn detect_unit(unit_field: Option<&str>, description: &str) -> Option<UnitInfo> {
    if let Some(unit) = unit_field.and_then(lookup) {
        return Some(unit);
    }

    for caps in RE_QUANTIFIED_UNIT.captures_iter(description) {
        if let Some(unit) = caps.get(1).and_then(|m| lookup(m.as_str())) {
            return Some(unit);
        }
    }

    description
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 3)
        .find_map(lookup)
}
