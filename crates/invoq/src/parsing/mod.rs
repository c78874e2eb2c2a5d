pub mod money;

pub use money::{display_rounded, parse_amount, FieldKind, ParseConfidence, ParseIssue, ParsedAmount};
