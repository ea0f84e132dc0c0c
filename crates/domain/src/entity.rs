//! Persistable entity trait.

use document_store::Document;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain types stored as documents.
///
/// An entity knows its collection, its document id and, optionally, the
/// owner key used for per-owner listings.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Returns the collection the entity is stored in.
    fn collection() -> &'static str;

    /// Returns the human-readable entity name used in errors.
    fn entity_name() -> &'static str;

    /// Returns the entity's document id.
    fn document_id(&self) -> String;

    /// Returns the owner key of the entity, if it has one.
    fn owner(&self) -> Option<String> {
        None
    }

    /// Serializes the entity into a document ready to be written.
    fn to_document(&self) -> Result<Document, serde_json::Error> {
        let document = Document::from_value(Self::collection(), self.document_id(), self)?;
        Ok(match self.owner() {
            Some(owner) => document.with_owner(owner),
            None => document,
        })
    }
}
