//! Test utilities
//!
//! Hand-written document store doubles and fixtures for unit testing.
//! The doubles wrap the in-memory store so behavior stays realistic while
//! tests can count backend calls or force failures.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
