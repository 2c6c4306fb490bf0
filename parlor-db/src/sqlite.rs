//! Durable single-file document store backed by SQLite.
//!
//! Each collection maps to one table of `(key, doc)` rows where `doc` is
//! the JSON document and `key` carries the value of the collection's key
//! field under a uniqueness constraint. Atomicity of `find_or_insert`
//! and `replace_one` rides on that constraint plus SQLite's own
//! statement-level atomicity.
//!
//! Sessions each own a private `Connection` — the canonical example of
//! an execution context that must not be shared unsynchronized between
//! threads, which is exactly what query-pool forking exists for.

use crate::{Credentials, Database, DatabaseKind, DbError, DbResult, Document, Session};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params, params_from_iter};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// A SQLite-backed document store rooted at one database file.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    path: PathBuf,
}

impl SqliteDatabase {
    /// Creates a handle for the given database file. The file is created
    /// on first session open.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The database file path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Database for SqliteDatabase {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Sqlite
    }

    fn login(&self, credentials: &Credentials) -> DbResult<()> {
        // File-level stores carry no account database; login verifies
        // the file is reachable and openable.
        let _probe = Connection::open(&self.path)?;
        debug!(
            user = %credentials.username,
            path = %self.path.display(),
            "sqlite database login"
        );
        Ok(())
    }

    fn open_session(&self) -> DbResult<Box<dyn Session>> {
        let conn = Connection::open(&self.path)?;
        // Concurrent sessions each hold their own connection; WAL plus a
        // busy timeout keeps writers from failing fast on contention.
        conn.query_row("PRAGMA journal_mode=WAL", [], |_row| Ok(()))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Box::new(SqliteSession {
            conn,
            ready: HashSet::new(),
        }))
    }
}

struct SqliteSession {
    conn: Connection,
    /// Collections whose table already exists in this session's view.
    ready: HashSet<String>,
}

impl SqliteSession {
    /// Validates the collection name and ensures its table, returning
    /// the table identifier safe to splice into SQL.
    fn table_for(&mut self, collection: &str) -> DbResult<String> {
        if collection.is_empty()
            || !collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(DbError::InvalidCollection(collection.to_string()));
        }
        let table = format!("col_{collection}");
        if !self.ready.contains(collection) {
            self.conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    key TEXT NOT NULL UNIQUE,
                    doc TEXT NOT NULL
                );"
            ))?;
            self.ready.insert(collection.to_string());
        }
        Ok(table)
    }
}

/// Validates a filter field name before it is spliced into a
/// `json_extract` path. Same restriction as collection names.
fn check_field(field: &str) -> DbResult<()> {
    if field.is_empty()
        || !field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(DbError::InvalidField(field.to_string()));
    }
    Ok(())
}

/// Converts a JSON filter value into a bindable SQL value, matching what
/// `json_extract` yields for the same JSON.
fn to_sql_value(field: &str, value: &Value) -> DbResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(DbError::Backend(format!(
                    "filter field '{field}' has an unrepresentable number"
                )))
            }
        }
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(DbError::Backend(format!(
            "filter field '{field}' must be a scalar"
        ))),
    }
}

impl Session for SqliteSession {
    fn find_one(&mut self, collection: &str, filter: &Document) -> DbResult<Option<Document>> {
        let table = self.table_for(collection)?;
        let mut clauses = Vec::new();
        let mut bindings = Vec::new();
        for (field, value) in filter.iter() {
            check_field(field)?;
            clauses.push(format!(
                "json_extract(doc, '$.{field}') = ?{}",
                bindings.len() + 1
            ));
            bindings.push(to_sql_value(field, value)?);
        }
        let sql = if clauses.is_empty() {
            format!("SELECT doc FROM {table} LIMIT 1")
        } else {
            format!("SELECT doc FROM {table} WHERE {} LIMIT 1", clauses.join(" AND "))
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bindings))?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                Ok(Some(Document::from_json(&json)?))
            }
            None => Ok(None),
        }
    }

    fn insert_one(&mut self, collection: &str, key_field: &str, doc: &Document) -> DbResult<()> {
        let table = self.table_for(collection)?;
        let key = doc.get_str(key_field).ok_or_else(|| {
            DbError::Backend(format!(
                "insert into '{collection}' is missing key field '{key_field}'"
            ))
        })?;
        self.conn.execute(
            &format!("INSERT INTO {table} (key, doc) VALUES (?1, ?2)"),
            params![key, doc.to_json()?],
        )?;
        Ok(())
    }

    fn find_or_insert(
        &mut self,
        collection: &str,
        key_field: &str,
        key: &str,
        template: &Document,
    ) -> DbResult<Document> {
        let table = self.table_for(collection)?;
        let mut doc = template.clone();
        doc.set(key_field, key);
        // INSERT OR IGNORE under the UNIQUE constraint: of N concurrent
        // callers exactly one insert lands, and the follow-up read
        // returns that single winning row for everyone.
        self.conn.execute(
            &format!("INSERT OR IGNORE INTO {table} (key, doc) VALUES (?1, ?2)"),
            params![key, doc.to_json()?],
        )?;
        let json: String = self.conn.query_row(
            &format!("SELECT doc FROM {table} WHERE key = ?1"),
            params![key],
            |row| row.get(0),
        )?;
        Ok(Document::from_json(&json)?)
    }

    fn replace_one(&mut self, collection: &str, key_field: &str, doc: &Document) -> DbResult<()> {
        let table = self.table_for(collection)?;
        let key = doc.get_str(key_field).ok_or_else(|| {
            DbError::Backend(format!(
                "replace in '{collection}' is missing key field '{key_field}'"
            ))
        })?;
        self.conn.execute(
            &format!(
                "INSERT INTO {table} (key, doc) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET doc = excluded.doc"
            ),
            params![key, doc.to_json()?],
        )?;
        Ok(())
    }
}
