//! HTTP handlers
//!
//! Axum request handlers for the API endpoints.

pub mod goals;
pub mod records;

pub use goals::goal_summary;
pub use records::routes;
