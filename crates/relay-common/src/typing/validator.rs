//! Value validation and conversion against semantic SQL types
//!
//! `validate` never panics and never errors; `convert` fails with a
//! [`TypeConversionError`] exactly when `validate` returns false. Callers
//! working with untrusted input validate before converting.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::value::{SqlType, TypedValue};

/// Explicit DATETIME2 formats tried in order after the RFC 3339 general
/// parse. The `%m/%d/%Y`-before-`%d/%m/%Y` priority is deliberate and must
/// not be reordered: it decides which reading wins for ambiguous inputs
/// like "03/04/2024", and reordering would silently change accepted-date
/// semantics for existing data.
const DATETIME_FORMATS: &[(&str, bool)] = &[
    ("%Y-%m-%d", true),
    ("%Y-%m-%d %H:%M:%S", false),
    ("%Y-%m-%dT%H:%M:%S", false),
    ("%Y-%m-%dT%H:%M:%SZ", false),
    ("%m/%d/%Y", true),
    ("%d.%m.%Y", true),
    ("%d/%m/%Y", true),
];

/// Boolean spellings accepted for BIT, matched case-insensitively after
/// trimming.
const BIT_TRUE: &[&str] = &["true", "yes", "1", "y"];
const BIT_FALSE: &[&str] = &["false", "no", "0", "n"];

/// Conversion failure for a value that does not parse under the target type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("value '{value}' is not valid for type {sql_type}")]
pub struct TypeConversionError {
    pub value: String,
    pub sql_type: SqlType,
}

/// Check whether a raw value is acceptable for the target type.
///
/// Empty or whitespace-only input is valid for every type (it converts to
/// NULL). Never panics.
pub fn validate(value: &str, sql_type: SqlType) -> bool {
    convert(value, sql_type).is_ok()
}

/// Convert a raw value into a [`TypedValue`].
///
/// Empty or whitespace-only input converts to [`TypedValue::Null`]
/// regardless of the target type. Fails with [`TypeConversionError`] for
/// values that do not parse.
pub fn convert(value: &str, sql_type: SqlType) -> Result<TypedValue, TypeConversionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(TypedValue::Null);
    }

    let fail = || TypeConversionError {
        value: value.to_string(),
        sql_type,
    };

    match sql_type {
        SqlType::Int => trimmed
            .parse::<i64>()
            .map(TypedValue::Int)
            .map_err(|_| fail()),
        SqlType::Decimal => BigDecimal::from_str(trimmed)
            .map(TypedValue::Decimal)
            .map_err(|_| fail()),
        SqlType::DateTime2 => parse_datetime(trimmed)
            .map(TypedValue::DateTime)
            .ok_or_else(fail),
        SqlType::Bit => {
            let lowered = trimmed.to_lowercase();
            if BIT_TRUE.contains(&lowered.as_str()) {
                Ok(TypedValue::Bit(true))
            } else if BIT_FALSE.contains(&lowered.as_str()) {
                Ok(TypedValue::Bit(false))
            } else {
                Err(fail())
            }
        },
        SqlType::UniqueIdentifier => Uuid::parse_str(trimmed)
            .map(TypedValue::Guid)
            .map_err(|_| fail()),
        // Pass-through, untrimmed: NVARCHAR preserves the raw value
        SqlType::NVarChar => Ok(TypedValue::Text(value.to_string())),
    }
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    // General parse first: full RFC 3339 timestamps with offset
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    for (format, date_only) in DATETIME_FORMATS {
        if *date_only {
            if let Ok(date) = NaiveDate::parse_from_str(value, format) {
                return date.and_hms_opt(0, 0, 0);
            }
        } else if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use proptest::prelude::*;

    #[test]
    fn test_empty_and_whitespace_convert_to_null_for_every_type() {
        for t in SqlType::CANDIDATES.iter().chain([SqlType::NVarChar].iter()) {
            assert!(validate("", *t));
            assert!(validate("   ", *t));
            assert_eq!(convert("", *t).unwrap(), TypedValue::Null);
            assert_eq!(convert(" \t ", *t).unwrap(), TypedValue::Null);
        }
    }

    #[test]
    fn test_int() {
        assert_eq!(convert("42", SqlType::Int).unwrap(), TypedValue::Int(42));
        assert_eq!(convert(" -7 ", SqlType::Int).unwrap(), TypedValue::Int(-7));
        assert!(!validate("42.5", SqlType::Int));
        assert!(!validate("hello", SqlType::Int));
    }

    #[test]
    fn test_decimal() {
        assert!(validate("42", SqlType::Decimal));
        assert!(validate("-3.14159", SqlType::Decimal));
        assert!(!validate("12,5", SqlType::Decimal));
        assert!(!validate("abc", SqlType::Decimal));
    }

    #[test]
    fn test_datetime_iso_formats() {
        for input in [
            "2024-03-15",
            "2024-03-15 10:30:00",
            "2024-03-15T10:30:00",
            "2024-03-15T10:30:00Z",
        ] {
            assert!(validate(input, SqlType::DateTime2), "rejected {input}");
        }
        assert!(!validate("15th of March", SqlType::DateTime2));
    }

    #[test]
    fn test_datetime_slash_priority_is_month_first() {
        // "03/04/2024" is ambiguous; the US-style format is tried first,
        // so it must parse as March 4th, not April 3rd.
        let dt = match convert("03/04/2024", SqlType::DateTime2).unwrap() {
            TypedValue::DateTime(dt) => dt,
            other => panic!("expected datetime, got {other:?}"),
        };
        assert_eq!((dt.month(), dt.day()), (3, 4));
    }

    #[test]
    fn test_datetime_day_first_fallbacks() {
        // Day > 12 cannot be a month, so only the day-first formats match.
        let dt = match convert("25/03/2024", SqlType::DateTime2).unwrap() {
            TypedValue::DateTime(dt) => dt,
            other => panic!("expected datetime, got {other:?}"),
        };
        assert_eq!((dt.day(), dt.month()), (25, 3));

        assert!(validate("25.03.2024", SqlType::DateTime2));
    }

    #[test]
    fn test_date_only_maps_to_midnight() {
        let dt = match convert("2024-03-15", SqlType::DateTime2).unwrap() {
            TypedValue::DateTime(dt) => dt,
            other => panic!("expected datetime, got {other:?}"),
        };
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (0, 0, 0));
    }

    #[test]
    fn test_bit_spellings() {
        for input in ["true", "TRUE", "Yes", "1", "y", " Y "] {
            assert_eq!(convert(input, SqlType::Bit).unwrap(), TypedValue::Bit(true));
        }
        for input in ["false", "No", "0", "n"] {
            assert_eq!(convert(input, SqlType::Bit).unwrap(), TypedValue::Bit(false));
        }
        assert!(!validate("maybe", SqlType::Bit));
        assert!(!validate("2", SqlType::Bit));
    }

    #[test]
    fn test_guid() {
        assert!(validate("6f9619ff-8b86-d011-b42d-00c04fc964ff", SqlType::UniqueIdentifier));
        assert!(!validate("not-a-guid", SqlType::UniqueIdentifier));
    }

    #[test]
    fn test_nvarchar_passes_through_unchanged() {
        assert_eq!(
            convert("  spaced out  ", SqlType::NVarChar).unwrap(),
            TypedValue::Text("  spaced out  ".to_string())
        );
    }

    proptest! {
        /// validate and convert always agree, for any input and any type.
        #[test]
        fn prop_validate_convert_agreement(value in ".{0,40}") {
            for t in SqlType::CANDIDATES.iter().chain([SqlType::NVarChar].iter()) {
                prop_assert_eq!(validate(&value, *t), convert(&value, *t).is_ok());
            }
        }

        /// NVARCHAR accepts everything.
        #[test]
        fn prop_nvarchar_always_valid(value in ".{0,40}") {
            prop_assert!(validate(&value, SqlType::NVarChar));
        }

        /// Any i64 renders to a string that round-trips through INT.
        #[test]
        fn prop_int_round_trip(n in any::<i64>()) {
            let converted = convert(&n.to_string(), SqlType::Int).unwrap();
            prop_assert_eq!(converted, TypedValue::Int(n));
        }
    }
}
