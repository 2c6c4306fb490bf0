//! In-process document store.
//!
//! Every session shares one `RwLock`-guarded map; `find_or_insert` and
//! `replace_one` run entirely inside a single write lock, which is what
//! makes them atomic with respect to concurrent sessions.

use crate::{Credentials, Database, DatabaseKind, DbError, DbResult, Document, Session};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

type Store = HashMap<String, Vec<Document>>;

/// An in-memory document store. Cheap to clone; clones share the data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    store: Arc<RwLock<Store>>,
}

impl MemoryDatabase {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows in a collection. Intended for tests
    /// and diagnostics.
    #[must_use]
    pub fn row_count(&self, collection: &str) -> usize {
        self.store
            .read()
            .unwrap()
            .get(collection)
            .map_or(0, Vec::len)
    }
}

impl Database for MemoryDatabase {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Memory
    }

    fn login(&self, credentials: &Credentials) -> DbResult<()> {
        // No credential store in-process; accept and record who asked.
        debug!(user = %credentials.username, "memory database login");
        Ok(())
    }

    fn open_session(&self) -> DbResult<Box<dyn Session>> {
        Ok(Box::new(MemorySession {
            store: Arc::clone(&self.store),
        }))
    }
}

struct MemorySession {
    store: Arc<RwLock<Store>>,
}

impl Session for MemorySession {
    fn find_one(&mut self, collection: &str, filter: &Document) -> DbResult<Option<Document>> {
        let store = self.store.read().unwrap();
        Ok(store
            .get(collection)
            .and_then(|rows| rows.iter().find(|doc| doc.matches(filter)))
            .cloned())
    }

    fn insert_one(&mut self, collection: &str, key_field: &str, doc: &Document) -> DbResult<()> {
        if doc.get(key_field).is_none() {
            return Err(DbError::Backend(format!(
                "insert into '{collection}' is missing key field '{key_field}'"
            )));
        }
        let mut store = self.store.write().unwrap();
        store.entry(collection.to_string()).or_default().push(doc.clone());
        Ok(())
    }

    fn find_or_insert(
        &mut self,
        collection: &str,
        key_field: &str,
        key: &str,
        template: &Document,
    ) -> DbResult<Document> {
        // Lookup and insert share one write lock; concurrent callers for
        // the same absent key serialize here and observe a single row.
        let mut store = self.store.write().unwrap();
        let rows = store.entry(collection.to_string()).or_default();
        if let Some(existing) = rows.iter().find(|doc| doc.get_str(key_field) == Some(key)) {
            return Ok(existing.clone());
        }
        let mut doc = template.clone();
        doc.set(key_field, key);
        rows.push(doc.clone());
        Ok(doc)
    }

    fn replace_one(&mut self, collection: &str, key_field: &str, doc: &Document) -> DbResult<()> {
        let key = doc.get_str(key_field).ok_or_else(|| {
            DbError::Backend(format!(
                "replace in '{collection}' is missing key field '{key_field}'"
            ))
        })?;
        let mut store = self.store.write().unwrap();
        let rows = store.entry(collection.to_string()).or_default();
        match rows
            .iter_mut()
            .find(|row| row.get_str(key_field) == Some(key))
        {
            Some(row) => *row = doc.clone(),
            None => rows.push(doc.clone()),
        }
        Ok(())
    }
}
