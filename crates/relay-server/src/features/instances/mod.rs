//! Adapter instance inspection and lifecycle pass-throughs

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::instances_routes;
