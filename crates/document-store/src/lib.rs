//! Versioned JSON document storage.
//!
//! Documents are grouped into collections and addressed by a string id.
//! Every write bumps the document's [`Version`], which callers use for
//! compare-and-swap updates through [`PutOptions`].

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use document::{Document, Version};
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::DocumentQuery;
pub use store::{DocumentStore, DocumentStoreExt, PutOptions};
