//! Catalog of books with precomputed predictions.
//!
//! Mirrors `predictions_cached/index.json`; searched in memory.

use serde::{Deserialize, Serialize};

/// A book in the precomputed library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Prediction file stem, e.g. `dprose_17`
    pub id: String,
    pub author: String,
    pub title: String,
    #[serde(
        rename = "releaseYear",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub release_year: Option<String>,
}

impl Book {
    /// Release year for display, `-` when unknown
    pub fn release_year_label(&self) -> &str {
        match self.release_year.as_deref() {
            Some(year) if !year.is_empty() => year,
            _ => "-",
        }
    }

    fn matches(&self, query_lower: &str) -> bool {
        self.title.to_lowercase().contains(query_lower)
            || self.author.to_lowercase().contains(query_lower)
            || self
                .release_year
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains(query_lower)
    }
}

/// In-memory catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub books: Vec<Book>,
}

impl Catalog {
    pub fn new(books: Vec<Book>) -> Self {
        Self { books }
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Get a book by id
    pub fn get(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    /// Case-insensitive substring match over title, author and release year.
    /// An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Book> {
        if query.is_empty() {
            return self.books.iter().collect();
        }

        let query_lower = query.to_lowercase();
        self.books
            .iter()
            .filter(|book| book.matches(&query_lower))
            .collect()
    }

    /// Books sorted by title for listing
    pub fn sorted_by_title(&self) -> Vec<&Book> {
        let mut books: Vec<&Book> = self.books.iter().collect();
        books.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        books
    }
}
