//! Normalized record payloads
//!
//! A [`RecordPayload`] is the unit that travels through the MessageBox:
//! one row of typed values plus the header schema it was validated
//! against. The payload serializes to JSON for storage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::validator::{convert, TypeConversionError};
use super::value::SqlType;
use crate::checksum::sha256_hex;

/// Name and inferred type of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub sql_type: SqlType,
}

/// Why a raw row was rejected during normalization.
///
/// Rejection happens before publish; a row with any invalid field is
/// dropped whole, never partially published.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("row has {actual} fields, schema has {expected} columns")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("column '{column}': {source}")]
    InvalidField {
        column: String,
        #[source]
        source: TypeConversionError,
    },
}

/// One normalized record: header schema plus one JSON value per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    pub columns: Vec<ColumnSchema>,
    pub values: Vec<serde_json::Value>,
}

impl RecordPayload {
    /// Validate and convert one raw row against a schema.
    ///
    /// Every field must convert under its column's type; empty fields
    /// become JSON null.
    pub fn from_row<S: AsRef<str>>(schema: &[ColumnSchema], raw: &[S]) -> Result<Self, RowError> {
        if raw.len() != schema.len() {
            return Err(RowError::ColumnCountMismatch {
                expected: schema.len(),
                actual: raw.len(),
            });
        }

        let mut values = Vec::with_capacity(raw.len());
        for (column, field) in schema.iter().zip(raw.iter()) {
            let typed = convert(field.as_ref(), column.sql_type).map_err(|source| {
                RowError::InvalidField {
                    column: column.name.clone(),
                    source,
                }
            })?;
            values.push(typed.to_json());
        }

        Ok(Self {
            columns: schema.to_vec(),
            values,
        })
    }

    /// Serialize to the JSON document stored in the MessageBox
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "columns": self.columns,
            "values": self.values,
        })
    }

    /// Hex-encoded SHA-256 digest of the serialized payload
    pub fn checksum(&self) -> String {
        sha256_hex(self.to_json().to_string().as_bytes())
    }
}
