//! Column conversions for enums, decimals and JSON sets.

use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::Row;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::canonical::{AdjustmentStatus, SourceLineRef, UnitCategory};
use crate::document::{ProcessingStatus, ReviewStatus, VerificationSource};
use crate::integrations::SupplierStatus;
use crate::ocr::OcrFailureCategory;
use crate::quality::QualityStatus;

use super::DatabaseError;

/// Stores an enum as its `as_str` text and reads it back through `FromStr`.
macro_rules! text_column {
    ($($ty:ty),+ $(,)?) => {$(
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    )+};
}

text_column!(
    ProcessingStatus,
    ReviewStatus,
    VerificationSource,
    OcrFailureCategory,
    SupplierStatus,
    QualityStatus,
    AdjustmentStatus,
    UnitCategory,
);

impl ToSql for SourceLineRef {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for SourceLineRef {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Decimals are stored as TEXT to keep full precision.
pub fn decimal_text(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_string())
}

/// Reads a nullable decimal TEXT column.
pub fn decimal_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(column)?;
    text.map(|t| {
        Decimal::from_str(&t).map_err(|e| conversion_error(row, column, Box::new(e)))
    })
    .transpose()
}

pub fn to_json<T: Serialize>(column: &'static str, value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::CorruptColumn {
        column,
        reason: e.to_string(),
    })
}

/// Reads a JSON TEXT column.
pub fn json_column<T: DeserializeOwned>(row: &Row<'_>, column: &str) -> rusqlite::Result<T> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(row, column, Box::new(e)))
}

/// Reads a nullable `YYYY-MM-DD` column.
pub fn date_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(column)?;
    text.map(|t| {
        NaiveDate::parse_from_str(&t, "%Y-%m-%d")
            .map_err(|e| conversion_error(row, column, Box::new(e)))
    })
    .transpose()
}

pub fn date_text(value: Option<NaiveDate>) -> Option<String> {
    value.map(|d| d.format("%Y-%m-%d").to_string())
}

fn conversion_error(
    row: &Row<'_>,
    column: &str,
    source: Box<dyn std::error::Error + Send + Sync>,
) -> rusqlite::Error {
    let index = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, source)
}
