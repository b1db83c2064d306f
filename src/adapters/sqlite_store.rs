//! Durable [`BookStore`] backed by a single SQLite database file.
//!
//! The connection lives behind a mutex and every statement runs on tokio's
//! blocking pool. Contention on the file itself is governed by SQLite's busy
//! timeout; no retries are layered on top.
use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::{
    core::Book,
    ports::book_store::{BookStore, InsertOutcome, StoreError, StoreResult},
};

const CREATE_BOOKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS books (
    id     TEXT PRIMARY KEY NOT NULL,
    name   TEXT NOT NULL,
    author TEXT NOT NULL
)";

pub struct SqliteBookStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBookStore {
    /// Open (or create) the database at `path` and make sure the `books`
    /// table exists.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(backend_error)?;
        Self::init(conn, busy_timeout)
    }

    /// In-memory database, mostly useful for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(backend_error)?;
        Self::init(conn, Duration::from_secs(5))
    }

    fn init(conn: Connection, busy_timeout: Duration) -> StoreResult<Self> {
        conn.busy_timeout(busy_timeout).map_err(backend_error)?;
        conn.execute(CREATE_BOOKS_TABLE, []).map_err(backend_error)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("sqlite task failed: {e}")))?
    }
}

fn backend_error(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        name: row.get(1)?,
        author: row.get(2)?,
    })
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn find_all(&self) -> StoreResult<Vec<Book>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, author FROM books")
                .map_err(backend_error)?;
            let rows = stmt.query_map([], row_to_book).map_err(backend_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(backend_error)
        })
        .await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Book>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, name, author FROM books WHERE id = ?1",
                params![id],
                row_to_book,
            )
            .optional()
            .map_err(backend_error)
        })
        .await
    }

    async fn insert(&self, book: &Book) -> StoreResult<()> {
        let book = book.clone();
        self.with_conn(move |conn| {
            match conn.execute(
                "INSERT INTO books (id, name, author) VALUES (?1, ?2, ?3)",
                params![book.id, book.name, book.author],
            ) {
                Ok(_) => Ok(()),
                Err(e) if is_constraint_violation(&e) => Err(StoreError::Duplicate(book.id)),
                Err(e) => Err(backend_error(e)),
            }
        })
        .await
    }

    async fn insert_if_absent(&self, book: &Book) -> StoreResult<InsertOutcome> {
        let book = book.clone();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "INSERT OR IGNORE INTO books (id, name, author) VALUES (?1, ?2, ?3)",
                    params![book.id, book.name, book.author],
                )
                .map_err(backend_error)?;
            Ok(if changed == 0 {
                InsertOutcome::AlreadyPresent
            } else {
                InsertOutcome::Inserted
            })
        })
        .await
    }

    async fn update_by_id(&self, id: &str, book: &Book) -> StoreResult<()> {
        let id = id.to_string();
        let book = book.clone();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE books SET name = ?2, author = ?3 WHERE id = ?1",
                    params![id, book.name, book.author],
                )
                .map_err(backend_error)?;
            if changed == 0 {
                Err(StoreError::NotFound(id))
            } else {
                Ok(())
            }
        })
        .await
    }
}
