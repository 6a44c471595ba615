//! SQLite-backed todo storage.
//!
//! The store is the only owner of item identity. Ids come from an
//! `AUTOINCREMENT` primary key, so SQLite itself guarantees that a deleted id
//! is never handed out again, and concurrent writers are serialised by
//! SQLite's own locking. There is no cache: every read goes to the database.
//!
//! A `rusqlite::Connection` is `Send` but not `Sync`, so the connection sits
//! behind a mutex and [`Store`] clones share it.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;

use crate::model::{TodoId, TodoItem, TodoList};

/// How long a statement waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS items (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    value TEXT,
    done  INTEGER DEFAULT 0
)";

/// Failures reported by [`Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No item has the given id.
    #[error("no todo item with id {0}")]
    NotFound(TodoId),

    /// A delete matched more than one row. Ids are unique, so this means the
    /// table is corrupt; the delete was rolled back.
    #[error("delete of id {id} matched {rows} rows, expected exactly 1")]
    AmbiguousDelete { id: TodoId, rows: usize },

    /// The database could not be opened, queried or written.
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),

    /// A thread panicked while holding the connection.
    #[error("storage connection lock poisoned")]
    Poisoned,
}

/// Durable home of every [`TodoItem`]. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (creating if needed) the database file at `path` and ensures the
    /// schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening todo database");
        Self::with_connection(Connection::open(path)?)
    }

    /// A private in-memory database, gone when the last clone is dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.initialize()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Creates the `items` table if it does not exist. Idempotent.
    pub fn initialize(&self) -> Result<(), StoreError> {
        self.lock()?.execute(SCHEMA, [])?;
        Ok(())
    }

    /// Round-trips a trivial query; used by the readiness probe.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.lock()?.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Every stored item, ascending by id. An empty table is an empty list.
    pub fn list_all(&self) -> Result<TodoList, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, value, done FROM items ORDER BY id")?;
        let items = stmt
            .query_map([], |row| {
                Ok(TodoItem { id: row.get(0)?, text: row.get(1)?, done: row.get(2)? })
            })?
            .collect::<Result<TodoList, _>>()?;
        Ok(items)
    }

    pub fn get_one(&self, id: TodoId) -> Result<TodoItem, StoreError> {
        self.lock()?
            .query_row(
                "SELECT value, done FROM items WHERE id = ?1",
                params![id],
                |row| Ok(TodoItem { id, text: row.get(0)?, done: row.get(1)? }),
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
    }

    /// Inserts a new, not-done item and returns its fresh id.
    ///
    /// Rejecting empty text is the caller's job.
    pub fn create(&self, text: &str) -> Result<TodoId, StoreError> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO items (value, done) VALUES (?1, 0)", params![text])?;
        Ok(conn.last_insert_rowid())
    }

    /// Sets the done flag. Setting the value an item already has is a no-op.
    pub fn set_done(&self, id: TodoId, done: bool) -> Result<(), StoreError> {
        let changed = self
            .lock()?
            .execute("UPDATE items SET done = ?1 WHERE id = ?2", params![done, id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Removes exactly one item.
    pub fn delete(&self, id: TodoId) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        match tx.execute("DELETE FROM items WHERE id = ?1", params![id])? {
            0 => Err(StoreError::NotFound(id)),
            1 => Ok(tx.commit()?),
            // Dropping `tx` rolls the delete back.
            rows => Err(StoreError::AmbiguousDelete { id, rows }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn empty_store_lists_nothing() {
        assert!(store().list_all().unwrap().is_empty());
    }

    #[test]
    fn created_items_are_not_done_and_get_fresh_ids() {
        let store = store();
        let a = store.create("buy milk").unwrap();
        let b = store.create("walk dog").unwrap();
        assert_ne!(a, b);

        let item = store.get_one(a).unwrap();
        assert_eq!(item, TodoItem::new(a, "buy milk"));
    }

    #[test]
    fn initialize_is_idempotent() {
        let store = store();
        store.create("keep me").unwrap();
        store.initialize().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn set_done_round_trips_and_is_idempotent() {
        let store = store();
        let id = store.create("x").unwrap();

        store.set_done(id, true).unwrap();
        store.set_done(id, true).unwrap();
        assert!(store.get_one(id).unwrap().done);

        store.set_done(id, false).unwrap();
        store.set_done(id, false).unwrap();
        assert!(!store.get_one(id).unwrap().done);
    }

    #[test]
    fn set_done_on_missing_id_is_not_found() {
        let err = store().set_done(42, true).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
    }

    #[test]
    fn get_one_on_missing_id_is_not_found() {
        assert!(matches!(store().get_one(9).unwrap_err(), StoreError::NotFound(9)));
    }

    #[test]
    fn delete_twice_is_not_found_the_second_time() {
        let store = store();
        let id = store.create("gone soon").unwrap();

        store.delete(id).unwrap();
        assert!(matches!(store.get_one(id).unwrap_err(), StoreError::NotFound(_)));
        assert!(matches!(store.delete(id).unwrap_err(), StoreError::NotFound(_)));
    }

    #[test]
    fn deleted_ids_are_never_reissued() {
        let store = store();
        let first = store.create("a").unwrap();
        let second = store.create("b").unwrap();
        store.delete(second).unwrap();

        let third = store.create("c").unwrap();
        assert!(third > second);
        assert!(second > first);
    }

    #[test]
    fn text_is_stored_verbatim() {
        let store = store();
        let text = "<b>&\"</b> ünïcode  spaced ";
        let id = store.create(text).unwrap();
        assert_eq!(store.get_one(id).unwrap().text, text);
    }

    #[test]
    fn scenario_from_create_to_delete() {
        let store = store();
        assert_eq!(store.create("buy milk").unwrap(), 1);
        assert_eq!(store.create("walk dog").unwrap(), 2);

        let all = store.list_all().unwrap();
        assert_eq!(all, vec![TodoItem::new(1, "buy milk"), TodoItem::new(2, "walk dog")]);

        store.set_done(1, true).unwrap();
        assert_eq!(
            store.get_one(1).unwrap(),
            TodoItem { id: 1, text: "buy milk".into(), done: true }
        );

        store.delete(2).unwrap();
        let ids: Vec<_> = store.list_all().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1]);
        assert!(matches!(store.get_one(2).unwrap_err(), StoreError::NotFound(2)));
    }

    #[test]
    fn writes_survive_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todo.db");

        let id = {
            let store = Store::open(&path).unwrap();
            let id = store.create("persisted").unwrap();
            store.set_done(id, true).unwrap();
            id
        };

        let reopened = Store::open(&path).unwrap();
        let item = reopened.get_one(id).unwrap();
        assert_eq!(item.text, "persisted");
        assert!(item.done);
    }

    #[test]
    fn clones_share_one_database_across_threads() {
        let store = store();
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || store.create(&format!("item {n}")).unwrap())
            })
            .collect();
        let mut ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(store.list_all().unwrap().len(), 8);
    }

    #[test]
    fn ping_succeeds_on_open_store() {
        store().ping().unwrap();
    }
}
