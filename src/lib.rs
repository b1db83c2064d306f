//! bookshelf - a small authenticated book catalog service.
//!
//! The service stores `Book` records keyed by a client-supplied id and exposes
//! them over HTTP: list all, fetch one, import a batch (inserting only ids that
//! are not stored yet), and update one. Every request must carry a single
//! shared HTTP Basic credential, and every completed request is counted and
//! timed in a Prometheus registry served at `/metrics`.
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use bookshelf::{
//!     AppState, CatalogMetrics, CatalogService, Credentials, InMemoryBookStore, build_router,
//!     metrics::DEFAULT_DURATION_BUCKETS,
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let catalog = CatalogService::new(Arc::new(InMemoryBookStore::new()));
//! let metrics = Arc::new(CatalogMetrics::new(DEFAULT_DURATION_BUCKETS)?);
//! let app = build_router(
//!     AppState::new(catalog, metrics),
//!     Credentials::new("admin", "secret", "bookshelf"),
//! );
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (the `BookStore` trait) from **adapters**
//! (in-memory and SQLite stores, the axum HTTP layer) while the catalog logic
//! lives in `core`. The store and metrics registry are injected when the
//! router is built; nothing is held in process-wide globals.
//!
//! # Batch import
//! Imports go through the store's atomic insert-if-absent. A duplicate-key
//! outcome, including one caused by a concurrent import racing on the same
//! id, is a skip rather than an error, so repeated or concurrent imports
//! converge to the first stored version of each id.
//!
//! # Error Handling
//! Store operations return [`StoreError`]; HTTP handlers map it through
//! [`ApiError`]. Bootstrap and configuration use `eyre::Result<T>` with
//! context attached via `WrapErr`.
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{
        ApiError, AppState, Credentials, InMemoryBookStore, SqliteBookStore, build_router,
        create_book_store,
    },
    core::{Book, BookList, CatalogService, ImportOutcome, ImportReport},
    metrics::CatalogMetrics,
    ports::book_store::{BookStore, InsertOutcome, StoreError},
    utils::GracefulShutdown,
};
