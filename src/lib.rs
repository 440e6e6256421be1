//! farms-epub: fetch Maxwell Institute books and package them as EPUB.

pub mod cli;
pub mod config;
pub mod epub;
pub mod model;
pub mod scraper;

// Re-exports for CLI and consumers.
pub use epub::{sanitize_title, write_book, EpubError, OutputMode};
pub use model::{Book, BookMetadata, Chapter};
pub use scraper::{
    HttpClient, HttpClientBuilder, MaxwellScraper, PageSource, ScrapeOptions, ScraperError,
};
