//! PostgreSQL adapters
//!
//! Implementation of the document store using SeaORM and PostgreSQL.

pub mod document_store;


pub use document_store::PostgresDocumentStore;
