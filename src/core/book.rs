//! Catalog record types shared by the store port, the catalog service and
//! the HTTP layer.
use serde::{Deserialize, Serialize};

/// A single catalog record. `id` is client-supplied and is the only field
/// with a uniqueness constraint. It may be omitted from an update body, where
/// the path carries the id instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub author: String,
}

impl Book {
    pub fn new(id: impl Into<String>, name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            author: author.into(),
        }
    }
}

/// Envelope used by the listing and batch import operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookList {
    pub items: Vec<Book>,
}

impl BookList {
    /// Position of the first item without an id.
    pub fn first_missing_id(&self) -> Option<usize> {
        self.items.iter().position(|book| book.id.is_empty())
    }
}

impl From<Vec<Book>> for BookList {
    fn from(items: Vec<Book>) -> Self {
        Self { items }
    }
}
