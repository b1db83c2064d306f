pub mod http_handler;
pub mod memory_store;
pub mod middleware;
pub mod sqlite_store;

use std::{sync::Arc, time::Duration};

/// Re-export commonly used types from adapters
pub use http_handler::{ApiError, AppState, build_router};
pub use memory_store::InMemoryBookStore;
pub use middleware::*;
pub use sqlite_store::SqliteBookStore;

use crate::{
    config::models::StorageConfig,
    ports::book_store::{BookStore, StoreResult},
};

/// Build the store selected by configuration.
pub fn create_book_store(config: &StorageConfig) -> StoreResult<Arc<dyn BookStore>> {
    match config {
        StorageConfig::Memory => Ok(Arc::new(InMemoryBookStore::new())),
        StorageConfig::Sqlite {
            path,
            busy_timeout_ms,
        } => Ok(Arc::new(SqliteBookStore::open(
            path,
            Duration::from_millis(*busy_timeout_ms),
        )?)),
    }
}
