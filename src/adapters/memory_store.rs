//! In-memory [`BookStore`] backed by a concurrent `scc::HashMap`.
//!
//! `insert_async` refuses to overwrite an existing key, which makes it the
//! atomic insert-if-absent primitive the catalog relies on. Nothing survives a
//! restart; use the SQLite adapter for durable storage.
use async_trait::async_trait;
use scc::HashMap;

use crate::{
    core::Book,
    ports::book_store::{BookStore, StoreError, StoreResult},
};

#[derive(Default)]
pub struct InMemoryBookStore {
    books: HashMap<String, Book>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn find_all(&self) -> StoreResult<Vec<Book>> {
        let mut books = Vec::with_capacity(self.books.len());
        self.books
            .iter_async(|_, book| {
                books.push(book.clone());
                true
            })
            .await;
        Ok(books)
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Book>> {
        Ok(self
            .books
            .get_async(&id.to_string())
            .await
            .map(|entry| entry.get().clone()))
    }

    async fn insert(&self, book: &Book) -> StoreResult<()> {
        self.books
            .insert_async(book.id.clone(), book.clone())
            .await
            .map_err(|(id, _)| StoreError::Duplicate(id))
    }

    async fn update_by_id(&self, id: &str, book: &Book) -> StoreResult<()> {
        match self.books.get_async(&id.to_string()).await {
            Some(mut entry) => {
                let stored = entry.get_mut();
                stored.name = book.name.clone();
                stored.author = book.author.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }
}
