//! Column conversions shared by the row types.
//!
//! Enums are stored as the same strings they serialize to on the wire, so
//! the database and event payloads never disagree on spelling.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DbError;

/// The serde string form of a unit enum variant.
pub(crate) fn to_text<T: Serialize>(value: &T) -> Result<String, DbError> {
    match serde_json::to_value(value)? {
        Value::String(text) => Ok(text),
        other => Err(DbError::Corrupt(format!("expected a string variant, got {other}"))),
    }
}

/// Parse a unit enum variant from its serde string form.
pub(crate) fn from_text<T: DeserializeOwned>(text: &str) -> Result<T, DbError> {
    Ok(serde_json::from_value(Value::String(text.to_owned()))?)
}

/// Widen an unsigned count for a `BIGINT` column.
pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Narrow a `BIGINT` column to `u32`.
pub(crate) fn to_u32(value: i64, column: &'static str) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_err| DbError::Corrupt(format!("{column} out of range: {value}")))
}

/// Narrow a `BIGINT` column to `u64`.
pub(crate) fn to_u64(value: i64, column: &'static str) -> Result<u64, DbError> {
    u64::try_from(value).map_err(|_err| DbError::Corrupt(format!("{column} out of range: {value}")))
}

/// Narrow a `SMALLINT` column to `u8`.
pub(crate) fn to_u8(value: i16, column: &'static str) -> Result<u8, DbError> {
    u8::try_from(value).map_err(|_err| DbError::Corrupt(format!("{column} out of range: {value}")))
}
