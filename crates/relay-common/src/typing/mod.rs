//! Type inference and validation engine
//!
//! Turns untyped tabular input into typed records before they enter the
//! MessageBox. A column's semantic SQL type is inferred from a sample of
//! its raw string values ([`infer_column_type`]), individual values are
//! checked and converted against a target type ([`validator`]), and whole
//! rows are normalized into a [`RecordPayload`] ready for publishing.

pub mod inference;
pub mod record;
pub mod validator;
pub mod value;

pub use inference::{infer_column_type, infer_schema};
pub use record::{ColumnSchema, RecordPayload, RowError};
pub use validator::{convert, validate, TypeConversionError};
pub use value::{SqlType, TypedValue};
