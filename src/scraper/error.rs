//! Shared error type for fetching and extraction.

use thiserror::Error;

/// Errors from the fetcher and the page extractors. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Invalid book id '{input}': {reason}")]
    InvalidBookId { input: String, reason: String },

    // HTTP and network
    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Page structure
    #[error("Unable to parse title and author from the book page.")]
    ParseBookInfo,

    #[error("Could not parse chapter title (expected '<title>{book_title} - ...</title>').")]
    ParseChapterTitle { book_title: String },

    #[error("Could not parse chapter body: no content_readable container found.")]
    ParseChapterBody,
}
