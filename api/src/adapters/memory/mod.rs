//! In-memory adapters
//!
//! Process-local storage used when no database is configured.

pub mod document_store;

pub use document_store::InMemoryDocumentStore;
