//! PostgreSQL store implementations
//!
//! Queries use the runtime-checked sqlx API so the build stays
//! independent of a live database; schemas live under `migrations/` at
//! the workspace root.

mod config;
mod instances;
mod interfaces;
mod messages;

pub use config::PgConfigStore;
pub use instances::PgInstanceStore;
pub use interfaces::PgInterfaceStore;
pub use messages::PgMessageStore;
