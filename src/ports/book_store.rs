use async_trait::async_trait;
use thiserror::Error;

use crate::core::Book;

/// Error type for book store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    /// An insert targeted an id that is already stored
    #[error("duplicate key: book '{0}' already exists")]
    Duplicate(String),

    /// An update targeted an id that is not stored
    #[error("book '{0}' not found")]
    NotFound(String),

    /// Any I/O or engine failure from the underlying storage
    #[error("storage error: {0}")]
    Backend(String),
}

/// Result type alias for book store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result of an atomic insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// BookStore defines the port (interface) to the storage engine holding the
/// authoritative catalog.
///
/// Implementations must be safe for concurrent use from many request tasks
/// without external locking.
#[async_trait]
pub trait BookStore: Send + Sync + 'static {
    /// Return every stored record. Order is storage-defined.
    async fn find_all(&self) -> StoreResult<Vec<Book>>;

    /// Look up one record. A missing record is `Ok(None)`, not an error.
    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Book>>;

    /// Insert a new record.
    ///
    /// Fails with [`StoreError::Duplicate`] when a record with the same id
    /// already exists.
    async fn insert(&self, book: &Book) -> StoreResult<()>;

    /// Replace `name` and `author` of the record stored under `id`.
    ///
    /// Fails with [`StoreError::NotFound`] when no such record exists.
    async fn update_by_id(&self, id: &str, book: &Book) -> StoreResult<()>;

    /// Atomically insert `book` unless its id is already stored.
    ///
    /// The default relies on `insert` reporting duplicates atomically and
    /// folds [`StoreError::Duplicate`] into [`InsertOutcome::AlreadyPresent`].
    async fn insert_if_absent(&self, book: &Book) -> StoreResult<InsertOutcome> {
        match self.insert(book).await {
            Ok(()) => Ok(InsertOutcome::Inserted),
            Err(StoreError::Duplicate(_)) => Ok(InsertOutcome::AlreadyPresent),
            Err(e) => Err(e),
        }
    }
}
