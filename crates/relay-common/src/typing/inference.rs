//! Column type inference from sampled values

use tracing::debug;

use super::record::ColumnSchema;
use super::validator::validate;
use super::value::SqlType;

/// Infer the semantic SQL type of one column from an ordered sample of its
/// raw values.
///
/// Empty and whitespace-only samples are ignored: they carry no type
/// information and will map to NULL regardless of the chosen type. The
/// candidate types are walked strictest-first and the first type under
/// which *every* non-empty sample validates wins. A column with zero
/// non-empty samples, or one where no candidate fits, is `NVARCHAR`.
pub fn infer_column_type<S: AsRef<str>>(samples: &[S]) -> SqlType {
    let non_empty: Vec<&str> = samples
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| !s.trim().is_empty())
        .collect();

    if non_empty.is_empty() {
        return SqlType::NVarChar;
    }

    for candidate in SqlType::CANDIDATES {
        if non_empty.iter().all(|v| validate(v, candidate)) {
            return candidate;
        }
    }

    SqlType::NVarChar
}

/// Infer a schema for a whole table from its header and the first
/// `sample_rows` data rows.
///
/// Rows shorter than the header contribute no sample for the missing
/// columns (ragged input is tolerated here; row-level validation rejects
/// it later).
pub fn infer_schema(header: &[String], rows: &[Vec<String>], sample_rows: usize) -> Vec<ColumnSchema> {
    let sample = &rows[..rows.len().min(sample_rows)];

    header
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let column_samples: Vec<&str> = sample
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|s| s.as_str())
                .collect();

            let sql_type = infer_column_type(&column_samples);
            debug!(column = %name, sql_type = %sql_type, samples = column_samples.len(), "Inferred column type");

            ColumnSchema {
                name: name.clone(),
                sql_type,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_all_ints_infer_int_not_a_looser_type() {
        assert_eq!(infer_column_type(&strs(&["1", "2", "3"])), SqlType::Int);
    }

    #[test]
    fn test_mixed_numeric_widens_to_decimal() {
        assert_eq!(infer_column_type(&strs(&["1", "2.5", "3"])), SqlType::Decimal);
    }

    #[test]
    fn test_non_parsing_value_falls_back_to_nvarchar() {
        assert_eq!(infer_column_type(&strs(&["1", "2", "hello"])), SqlType::NVarChar);
    }

    #[test]
    fn test_dates() {
        assert_eq!(
            infer_column_type(&strs(&["2024-01-01", "2024-06-30 12:00:00"])),
            SqlType::DateTime2
        );
    }

    #[test]
    fn test_booleans() {
        assert_eq!(infer_column_type(&strs(&["yes", "no", "YES"])), SqlType::Bit);
        // Pure 1/0 columns are INT: the numeric candidate is stricter and
        // is tried first.
        assert_eq!(infer_column_type(&strs(&["1", "0", "1"])), SqlType::Int);
    }

    #[test]
    fn test_guids() {
        assert_eq!(
            infer_column_type(&strs(&[
                "6f9619ff-8b86-d011-b42d-00c04fc964ff",
                "0e984725-c51c-4bf4-9960-e1c80e27aba0",
            ])),
            SqlType::UniqueIdentifier
        );
    }

    #[test]
    fn test_empty_samples_are_ignored() {
        assert_eq!(infer_column_type(&strs(&["", "42", "  ", "7"])), SqlType::Int);
    }

    #[test]
    fn test_all_empty_infers_nvarchar() {
        assert_eq!(infer_column_type(&strs(&["", "   ", ""])), SqlType::NVarChar);
        assert_eq!(infer_column_type(&Vec::<String>::new()), SqlType::NVarChar);
    }

    #[test]
    fn test_infer_schema_respects_sample_window() {
        let header = strs(&["id", "amount", "note"]);
        let rows = vec![
            strs(&["1", "9.99", "first"]),
            strs(&["2", "12.00", "second"]),
            // Beyond the sample window; would otherwise force NVARCHAR on "amount"
            strs(&["3", "free", "third"]),
        ];

        let schema = infer_schema(&header, &rows, 2);
        assert_eq!(schema.len(), 3);
        assert_eq!(schema[0].sql_type, SqlType::Int);
        assert_eq!(schema[1].sql_type, SqlType::Decimal);
        assert_eq!(schema[2].sql_type, SqlType::NVarChar);
    }

    #[test]
    fn test_infer_schema_tolerates_ragged_rows() {
        let header = strs(&["a", "b"]);
        let rows = vec![strs(&["1"]), strs(&["2", "x"])];

        let schema = infer_schema(&header, &rows, 10);
        assert_eq!(schema[0].sql_type, SqlType::Int);
        assert_eq!(schema[1].sql_type, SqlType::NVarChar);
    }
}
