//! Domain layer
//!
//! Contains pure business logic with no external dependencies.
//! - `tenant`: Tenant identity and request-scoped context
//! - `aggregate`: Aggregate trait and stored record envelope
//! - `entities`: Domain models tracked by the application
//! - `ports`: Trait definitions for external dependencies

pub mod aggregate;
pub mod entities;
pub mod ports;
pub mod tenant;
