//! Relay Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Relay broker.
//!
//! # Overview
//!
//! This crate provides common functionality used across all Relay workspace
//! members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized tracing configuration
//! - **Checksums**: Payload integrity digests
//! - **Types**: Shared domain types (adapter identity, adapter type)
//! - **Typing**: The type inference and validation engine that turns
//!   untyped tabular input into typed records
//!
//! # Example
//!
//! ```no_run
//! use relay_common::typing::{infer_column_type, SqlType};
//!
//! let samples = vec!["1".to_string(), "2".to_string(), "3".to_string()];
//! assert_eq!(infer_column_type(&samples), SqlType::Int);
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;
pub mod typing;

// Re-export commonly used types
pub use error::{RelayError, Result};
pub use types::{AdapterIdentity, AdapterType};
