//! Semantic SQL types and typed values

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Semantic SQL type of a column.
///
/// The variants are ordered by strictness: numeric types are the most
/// constrained, dates and booleans are pattern-constrained, GUID is a
/// distinctive fixed format, and `NVarChar` accepts anything. Inference
/// walks [`SqlType::CANDIDATES`] in this order and falls back to
/// `NVarChar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    #[serde(rename = "INT")]
    Int,
    #[serde(rename = "DECIMAL")]
    Decimal,
    #[serde(rename = "DATETIME2")]
    DateTime2,
    #[serde(rename = "BIT")]
    Bit,
    #[serde(rename = "UNIQUEIDENTIFIER")]
    UniqueIdentifier,
    #[serde(rename = "NVARCHAR")]
    NVarChar,
}

impl SqlType {
    /// Candidate types tried during inference, strictest first.
    /// `NVarChar` is the universal fallback and deliberately absent.
    pub const CANDIDATES: [SqlType; 5] = [
        SqlType::Int,
        SqlType::Decimal,
        SqlType::DateTime2,
        SqlType::Bit,
        SqlType::UniqueIdentifier,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            SqlType::Int => "INT",
            SqlType::Decimal => "DECIMAL",
            SqlType::DateTime2 => "DATETIME2",
            SqlType::Bit => "BIT",
            SqlType::UniqueIdentifier => "UNIQUEIDENTIFIER",
            SqlType::NVarChar => "NVARCHAR",
        }
    }
}

impl std::str::FromStr for SqlType {
    type Err = crate::error::RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INT" => Ok(SqlType::Int),
            "DECIMAL" => Ok(SqlType::Decimal),
            "DATETIME2" => Ok(SqlType::DateTime2),
            "BIT" => Ok(SqlType::Bit),
            "UNIQUEIDENTIFIER" => Ok(SqlType::UniqueIdentifier),
            "NVARCHAR" => Ok(SqlType::NVarChar),
            other => Err(crate::error::RelayError::Validation(format!(
                "Unknown SQL type: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A converted value, carrying the universal NULL representation for
/// empty input.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Int(i64),
    Decimal(BigDecimal),
    DateTime(NaiveDateTime),
    Bit(bool),
    Guid(Uuid),
    Text(String),
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// Render as a JSON payload value. Decimals and GUIDs are rendered as
    /// strings so no precision or formatting is lost in transit; datetimes
    /// use the ISO 8601 second-resolution form.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TypedValue::Null => serde_json::Value::Null,
            TypedValue::Int(v) => serde_json::Value::from(*v),
            TypedValue::Decimal(v) => serde_json::Value::from(v.to_string()),
            TypedValue::DateTime(v) => {
                serde_json::Value::from(v.format("%Y-%m-%dT%H:%M:%S").to_string())
            },
            TypedValue::Bit(v) => serde_json::Value::from(*v),
            TypedValue::Guid(v) => serde_json::Value::from(v.to_string()),
            TypedValue::Text(v) => serde_json::Value::from(v.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_candidate_order_is_strictest_first() {
        assert_eq!(SqlType::CANDIDATES[0], SqlType::Int);
        assert_eq!(SqlType::CANDIDATES[4], SqlType::UniqueIdentifier);
        assert!(!SqlType::CANDIDATES.contains(&SqlType::NVarChar));
    }

    #[test]
    fn test_sql_type_round_trip() {
        for t in SqlType::CANDIDATES.iter().chain([SqlType::NVarChar].iter()) {
            assert_eq!(SqlType::from_str(t.as_str()).unwrap(), *t);
        }
        assert!(SqlType::from_str("VARCHAR2").is_err());
    }

    #[test]
    fn test_to_json_renders_decimal_as_string() {
        let v = TypedValue::Decimal(BigDecimal::from_str("12.340").unwrap());
        assert_eq!(v.to_json(), serde_json::Value::from("12.340"));
    }

    #[test]
    fn test_to_json_null() {
        assert_eq!(TypedValue::Null.to_json(), serde_json::Value::Null);
        assert!(TypedValue::Null.is_null());
    }
}
