//! A document bound to its collection and key field.

use crate::{DbResult, Document, Session};
use serde_json::Value;
use uuid::Uuid;

/// One persisted row, carrying enough context to be written back.
///
/// Field reads and writes only touch the in-memory document; nothing
/// reaches the backend until [`DatabaseItem::push`] runs.
#[derive(Debug, Clone)]
pub struct DatabaseItem {
    collection: String,
    key_field: String,
    doc: Document,
}

impl DatabaseItem {
    /// Wraps a document fetched from (or destined for) `collection`,
    /// keyed by `key_field`.
    #[must_use]
    pub fn new(
        collection: impl Into<String>,
        key_field: impl Into<String>,
        doc: Document,
    ) -> Self {
        Self {
            collection: collection.into(),
            key_field: key_field.into(),
            doc,
        }
    }

    /// The collection this row lives in.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The field that uniquely keys this row.
    #[must_use]
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// The underlying document.
    #[must_use]
    pub fn doc(&self) -> &Document {
        &self.doc
    }

    /// Mutable access to the underlying document.
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Returns a string field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.doc.get_str(field)
    }

    /// Returns an unsigned 32-bit field.
    #[must_use]
    pub fn get_u32(&self, field: &str) -> Option<u32> {
        self.doc.get_u32(field)
    }

    /// Returns a UUID field.
    #[must_use]
    pub fn get_uuid(&self, field: &str) -> Option<Uuid> {
        self.doc.get_uuid(field)
    }

    /// Sets a field on the in-memory document.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.doc.set(field, value);
    }

    /// Writes the full document back to the store, replacing the row
    /// with the same key (inserting when absent).
    pub fn push(&self, session: &mut dyn Session) -> DbResult<()> {
        session.replace_one(&self.collection, &self.key_field, &self.doc)
    }
}
