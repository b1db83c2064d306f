//! Catalog orchestration service.
//!
//! `CatalogService` owns no data itself. It coordinates the operations the
//! HTTP layer exposes against an injected [`BookStore`]:
//! * Listing and single-record lookup
//! * Idempotent batch import (insert only ids not already stored)
//! * Full-record update keyed by id
//!
//! Batch import never uses a separate existence check followed by an insert.
//! Each item goes through the store's atomic insert-if-absent, so concurrent
//! imports with overlapping ids converge to the first inserted version and a
//! lost race is indistinguishable from "already present".
use std::sync::Arc;

use crate::{
    core::Book,
    ports::book_store::{BookStore, InsertOutcome, StoreError, StoreResult},
};

/// Per-item result of a batch import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Inserted,
    AlreadyPresent,
    Failed(StoreError),
}

/// Outcome of one batch import: what happened to every submitted item, and
/// the catalog as it stood after the last item was attempted.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub outcomes: Vec<(String, ImportOutcome)>,
    pub catalog: Vec<Book>,
}

impl ImportReport {
    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, ImportOutcome::Inserted))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ImportOutcome::AlreadyPresent))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ImportOutcome::Failed(_)))
    }

    /// The first per-item failure, in submission order.
    pub fn first_error(&self) -> Option<&StoreError> {
        self.outcomes.iter().find_map(|(_, outcome)| match outcome {
            ImportOutcome::Failed(e) => Some(e),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&ImportOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Coordinates catalog operations over a shared [`BookStore`]. Cheap to
/// clone.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn BookStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> StoreResult<Vec<Book>> {
        self.store.find_all().await
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Book>> {
        self.store.get_by_id(id).await
    }

    /// Import `books` in order, inserting only ids that are not yet stored.
    ///
    /// Item failures are collected and never stop the remaining items. The
    /// only error returned is a failure to read the final catalog.
    pub async fn import_batch(&self, books: &[Book]) -> StoreResult<ImportReport> {
        let mut outcomes = Vec::with_capacity(books.len());

        for book in books {
            let outcome = match self.store.insert_if_absent(book).await {
                Ok(InsertOutcome::Inserted) => ImportOutcome::Inserted,
                Ok(InsertOutcome::AlreadyPresent) | Err(StoreError::Duplicate(_)) => {
                    tracing::debug!(id = %book.id, "Book already present, skipping");
                    ImportOutcome::AlreadyPresent
                }
                Err(e) => {
                    tracing::error!(id = %book.id, error = %e, "Failed to import book");
                    ImportOutcome::Failed(e)
                }
            };
            outcomes.push((book.id.clone(), outcome));
        }

        let catalog = self.store.find_all().await?;
        Ok(ImportReport { outcomes, catalog })
    }

    /// Replace the fields of the record stored under `id` with those of
    /// `book`. The id inside `book` is ignored.
    pub async fn update(&self, id: &str, book: &Book) -> StoreResult<()> {
        self.store.update_by_id(id, book).await
    }
}
