pub mod book;
pub mod catalog;

pub use book::{Book, BookList};
pub use catalog::{CatalogService, ImportOutcome, ImportReport};
