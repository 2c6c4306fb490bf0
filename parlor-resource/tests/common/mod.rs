//! Shared test helpers for resource core tests.

#![allow(dead_code)]

use parlor_db::{Credentials, Database, DatabaseKind, DatabaseItem, DbResult, Document, MemoryDatabase, Session};
use parlor_resource::{HookError, Resource, ResourceManager, ResourceType, SharedResource};
use parlor_types::{LocalId, TypeIdentifier, UniversalId};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

// ── Note: a minimal concrete resource ─────────────────────────────

/// A trivial resource with one mutable text field.
pub struct Note {
    universal_id: UniversalId,
    local_id: LocalId,
    type_hash: u32,
    pub body: RwLock<String>,
}

impl Note {
    pub fn body(&self) -> String {
        self.body.read().unwrap().clone()
    }

    pub fn set_body(&self, body: impl Into<String>) {
        *self.body.write().unwrap() = body.into();
    }
}

impl Resource for Note {
    fn universal_id(&self) -> UniversalId {
        self.universal_id
    }

    fn local_id(&self) -> LocalId {
        self.local_id
    }

    fn type_hash(&self) -> u32 {
        self.type_hash
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct NoteType {
    identifier: TypeIdentifier,
}

impl NoteType {
    pub fn new() -> Arc<dyn ResourceType> {
        Arc::new(Self {
            identifier: TypeIdentifier::new("note"),
        })
    }
}

impl ResourceType for NoteType {
    fn identifier(&self) -> &TypeIdentifier {
        &self.identifier
    }

    fn new_instance(&self, universal_id: UniversalId, local_id: LocalId) -> SharedResource {
        Arc::new(Note {
            universal_id,
            local_id,
            type_hash: self.identifier.hash(),
            body: RwLock::new(String::new()),
        })
    }

    fn save_resource(
        &self,
        _manager: &ResourceManager,
        item: &mut DatabaseItem,
        resource: &dyn Resource,
    ) -> Result<(), HookError> {
        let note = resource
            .as_any()
            .downcast_ref::<Note>()
            .ok_or_else(|| HookError::new("resource is not a Note"))?;
        item.set("body", note.body());
        Ok(())
    }

    fn load_resource(
        &self,
        _manager: &ResourceManager,
        item: &DatabaseItem,
        resource: &dyn Resource,
    ) -> Result<(), HookError> {
        let note = resource
            .as_any()
            .downcast_ref::<Note>()
            .ok_or_else(|| HookError::new("resource is not a Note"))?;
        // Rows created by find-or-create have no body yet.
        if let Some(body) = item.get_str("body") {
            note.set_body(body);
        }
        Ok(())
    }
}

/// A type whose load hook always fails, for corrupt-record paths.
pub struct BrokenType {
    identifier: TypeIdentifier,
}

impl BrokenType {
    pub fn new(name: &str) -> Arc<dyn ResourceType> {
        Arc::new(Self {
            identifier: TypeIdentifier::new(name),
        })
    }
}

impl ResourceType for BrokenType {
    fn identifier(&self) -> &TypeIdentifier {
        &self.identifier
    }

    fn new_instance(&self, universal_id: UniversalId, local_id: LocalId) -> SharedResource {
        Arc::new(Note {
            universal_id,
            local_id,
            type_hash: self.identifier.hash(),
            body: RwLock::new(String::new()),
        })
    }

    fn save_resource(
        &self,
        _manager: &ResourceManager,
        _item: &mut DatabaseItem,
        _resource: &dyn Resource,
    ) -> Result<(), HookError> {
        Err(HookError::new("save always fails"))
    }

    fn load_resource(
        &self,
        _manager: &ResourceManager,
        _item: &DatabaseItem,
        _resource: &dyn Resource,
    ) -> Result<(), HookError> {
        Err(HookError::new("record incompatible"))
    }
}

// ── Counting database wrapper ─────────────────────────────────────

/// Wraps `MemoryDatabase` and counts `find_one` calls, so tests can
/// assert how many backend fetches an operation cost.
#[derive(Clone)]
pub struct CountingDatabase {
    inner: MemoryDatabase,
    finds: Arc<AtomicUsize>,
}

impl CountingDatabase {
    pub fn new() -> Self {
        Self {
            inner: MemoryDatabase::new(),
            finds: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn find_count(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn memory(&self) -> &MemoryDatabase {
        &self.inner
    }
}

impl Database for CountingDatabase {
    fn kind(&self) -> DatabaseKind {
        self.inner.kind()
    }

    fn login(&self, credentials: &Credentials) -> DbResult<()> {
        self.inner.login(credentials)
    }

    fn open_session(&self) -> DbResult<Box<dyn Session>> {
        Ok(Box::new(CountingSession {
            inner: self.inner.open_session()?,
            finds: Arc::clone(&self.finds),
        }))
    }
}

struct CountingSession {
    inner: Box<dyn Session>,
    finds: Arc<AtomicUsize>,
}

impl Session for CountingSession {
    fn find_one(&mut self, collection: &str, filter: &Document) -> DbResult<Option<Document>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(collection, filter)
    }

    fn insert_one(&mut self, collection: &str, key_field: &str, doc: &Document) -> DbResult<()> {
        self.inner.insert_one(collection, key_field, doc)
    }

    fn find_or_insert(
        &mut self,
        collection: &str,
        key_field: &str,
        key: &str,
        template: &Document,
    ) -> DbResult<Document> {
        self.inner.find_or_insert(collection, key_field, key, template)
    }

    fn replace_one(&mut self, collection: &str, key_field: &str, doc: &Document) -> DbResult<()> {
        self.inner.replace_one(collection, key_field, doc)
    }
}

// ── Manager construction ──────────────────────────────────────────

pub const SERVER: &str = "parlor";

/// Manager over a plain in-memory store with the Note type registered.
pub fn note_manager() -> (ResourceManager, MemoryDatabase) {
    let db = MemoryDatabase::new();
    let manager = ResourceManager::new(SERVER, Arc::new(db.clone()));
    manager.register_type(NoteType::new()).unwrap();
    (manager, db)
}

/// Manager over a counting store with the Note type registered.
pub fn counting_manager() -> (ResourceManager, CountingDatabase) {
    let db = CountingDatabase::new();
    let manager = ResourceManager::new(SERVER, Arc::new(db.clone()));
    manager.register_type(NoteType::new()).unwrap();
    (manager, db)
}

/// Seeds a saved note row directly through the store and returns its id.
pub fn seed_note(db: &dyn Database, body: &str) -> (UniversalId, LocalId) {
    let universal_id = UniversalId::new();
    let local_id = LocalId::new();
    let mut doc = Document::new();
    doc.set("uuid", universal_id.to_string());
    doc.set("localId", local_id.to_string());
    doc.set("type", parlor_types::stable_type_hash("note"));
    doc.set("body", body);
    db.open_session()
        .unwrap()
        .insert_one(&format!("{SERVER}_resources"), "uuid", &doc)
        .unwrap();
    (universal_id, local_id)
}

/// Downcast helper.
pub fn as_note(resource: &SharedResource) -> &Note {
    resource.as_any().downcast_ref::<Note>().unwrap()
}
