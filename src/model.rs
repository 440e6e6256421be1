//! Data model for a scraped book.
//!
//! The scraper produces a [Book]; the EPUB writer consumes it.

/// Book-level fields pulled once from the landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    /// Landing-page URL. Used as the package identifier and NCX uid.
    pub source_id: String,
}

/// One chapter in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    /// Raw markup captured from the chapter page.
    pub body: String,
}

/// A fully scraped book: metadata plus every chapter, in order.
///
/// Only built once all chapters were retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub metadata: BookMetadata,
    pub chapters: Vec<Chapter>,
}

impl Book {
    pub fn new(metadata: BookMetadata, chapters: Vec<Chapter>) -> Self {
        Self { metadata, chapters }
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn author(&self) -> &str {
        &self.metadata.author
    }
}
