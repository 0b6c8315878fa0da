//! MessageBox inspection and operator retry

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::{messages_routes, subscriptions_routes};
