//! Named query catalog with forkable execution state.
//!
//! A [`QueryPool`] pairs two things with very different sharing rules:
//! a read-mostly catalog of named query definitions, shared by every
//! fork, and a lazily opened backend [`Session`], owned exclusively by
//! one fork. Forking exists because sessions are not safe for
//! concurrent unsynchronized use; each task-ish caller runs its queries
//! through its own fork.

use crate::{Database, DatabaseItem, DatabaseKind, DbError, DbResult, Session};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A string-keyed parameter bag passed to query executors.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, Value>,
}

impl Params {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Returns the raw value of a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns a string parameter.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Returns a UUID parameter stored in string form.
    #[must_use]
    pub fn get_uuid(&self, key: &str) -> Option<Uuid> {
        self.get_str(key).and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// Execution context handed to query executors.
pub struct QueryCtx<'a> {
    /// The calling fork's backend session.
    pub session: &'a mut dyn Session,
}

type QueryFn = Arc<dyn Fn(&mut QueryCtx<'_>, &Params) -> DbResult<Option<DatabaseItem>> + Send + Sync>;

struct QueryDef {
    kind: DatabaseKind,
    run: QueryFn,
}

type Catalog = HashMap<String, Arc<QueryDef>>;

/// A named query catalog bound to one fork's execution state.
pub struct QueryPool {
    catalog: Arc<RwLock<Catalog>>,
    session: Option<Box<dyn Session>>,
}

impl QueryPool {
    /// Creates a pool with an empty catalog and no open session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(RwLock::new(HashMap::new())),
            session: None,
        }
    }

    /// Registers (or overwrites) a named query definition. Definitions
    /// are visible to every fork of this pool, existing and future.
    pub fn put_query<F>(&self, name: impl Into<String>, kind: DatabaseKind, run: F)
    where
        F: Fn(&mut QueryCtx<'_>, &Params) -> DbResult<Option<DatabaseItem>> + Send + Sync + 'static,
    {
        let def = Arc::new(QueryDef {
            kind,
            run: Arc::new(run),
        });
        self.catalog.write().unwrap().insert(name.into(), def);
    }

    /// Returns whether a definition with this name exists.
    #[must_use]
    pub fn has_query(&self, name: &str) -> bool {
        self.catalog.read().unwrap().contains_key(name)
    }

    /// Creates a fork: same definition catalog, independent execution
    /// state. The fork opens its own session on first use.
    #[must_use]
    pub fn fork(&self) -> QueryPool {
        QueryPool {
            catalog: Arc::clone(&self.catalog),
            session: None,
        }
    }

    /// Binds this pool to a backend handle for execution.
    pub fn current<'a>(&'a mut self, database: &'a dyn Database) -> BoundPool<'a> {
        BoundPool {
            pool: self,
            database,
        }
    }

    fn session_for(&mut self, database: &dyn Database) -> DbResult<&mut dyn Session> {
        if self.session.is_none() {
            self.session = Some(database.open_session()?);
        }
        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(DbError::Backend("session unavailable".into())),
        }
    }
}

impl Default for QueryPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`QueryPool`] temporarily bound to a backend handle.
pub struct BoundPool<'a> {
    pool: &'a mut QueryPool,
    database: &'a dyn Database,
}

impl BoundPool<'_> {
    /// Resolves and runs the named query against the bound backend.
    ///
    /// `Ok(None)` means the query ran and found nothing; failures are
    /// always `Err` — absence and error are never conflated.
    pub fn query_sync(&mut self, name: &str, params: &Params) -> DbResult<Option<DatabaseItem>> {
        let def = {
            let catalog = self.pool.catalog.read().unwrap();
            catalog
                .get(name)
                .cloned()
                .ok_or_else(|| DbError::UnknownQuery(name.to_string()))?
        };
        if def.kind != self.database.kind() {
            return Err(DbError::KindMismatch {
                name: name.to_string(),
                expected: def.kind,
                actual: self.database.kind(),
            });
        }
        let session = self.pool.session_for(self.database)?;
        let mut ctx = QueryCtx { session };
        (def.run)(&mut ctx, params)
    }

    /// Writes an item's document back through this fork's session.
    pub fn push(&mut self, item: &DatabaseItem) -> DbResult<()> {
        let session = self.pool.session_for(self.database)?;
        item.push(session)
    }
}
