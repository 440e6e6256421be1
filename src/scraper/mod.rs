//! Fetching and extraction. Page source trait, HTTP client, regex extractors, and the site adapter.

mod client;
mod error;

pub mod extract;
pub mod maxwell;

pub use client::{HttpClient, HttpClientBuilder};
pub use error::ScraperError;
pub use maxwell::MaxwellScraper;

/// Publications endpoint of the Maxwell Institute site. Query strings are appended after `?`.
pub const DEFAULT_BASE_URL: &str = "http://maxwellinstitute.byu.edu/publications/books/";

/// Anything that can turn a URL into page text.
///
/// Implemented by [HttpClient]; tests implement it over canned pages.
pub trait PageSource {
    fn fetch_text(&mut self, url: &str) -> Result<String, ScraperError>;
}

impl<T: PageSource + ?Sized> PageSource for &mut T {
    fn fetch_text(&mut self, url: &str) -> Result<String, ScraperError> {
        (**self).fetch_text(url)
    }
}

/// Options for a scrape run.
#[derive(Default)]
pub struct ScrapeOptions<'a> {
    /// Called once the landing page yielded (title, author).
    pub on_book: Option<&'a dyn Fn(&str, &str)>,
    /// Called after each chapter with (done, total, chapter title).
    pub progress: Option<&'a dyn Fn(usize, usize, &str)>,
}

/// Book ids are spliced into query strings; only ASCII alphanumerics are accepted.
pub fn validate_book_id(input: &str) -> Result<&str, ScraperError> {
    if input.is_empty() {
        return Err(ScraperError::InvalidBookId {
            input: input.to_string(),
            reason: "book id is empty".to_string(),
        });
    }
    if let Some(c) = input.chars().find(|c| !c.is_ascii_alphanumeric()) {
        return Err(ScraperError::InvalidBookId {
            input: input.to_string(),
            reason: format!("unexpected character {:?}", c),
        });
    }
    Ok(input)
}
