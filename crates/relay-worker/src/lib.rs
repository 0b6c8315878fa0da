//! Relay Worker Library
//!
//! The data plane of the Relay broker. One worker process runs one
//! adapter instance, provisioned and monitored by the orchestrator:
//!
//! - **Source role**: read raw tabular input, infer and validate types,
//!   publish normalized records into the MessageBox
//! - **Destination role**: poll pending subscriptions, process each
//!   delivery, and acknowledge with a terminal status
//!
//! The instance identity and its settings arrive as environment
//! variables injected by the orchestrator (see
//! `relay_common::types::env`).

pub mod backoff;
pub mod config;
pub mod destination;
pub mod source;
