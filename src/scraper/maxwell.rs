//! Maxwell Institute adapter. Fetches the book page (title, author, chapter refs) then each
//! chapter page in order; produces a [Book] only when every chapter parsed.

use crate::model::{Book, BookMetadata};
use crate::scraper::extract::{extract_book_info, extract_chapter_content, extract_chapters};
use crate::scraper::{validate_book_id, PageSource, ScrapeOptions, ScraperError};

/// Scraper for one publications endpoint over any [PageSource].
pub struct MaxwellScraper<S> {
    source: S,
    base_url: String,
}

impl<S: PageSource> MaxwellScraper<S> {
    pub fn new(source: S, base_url: impl Into<String>) -> Self {
        Self {
            source,
            base_url: base_url.into(),
        }
    }

    /// `<base>?bookid=<id>`
    pub fn landing_url(&self, book_id: &str) -> String {
        format!("{}?bookid={}", self.base_url, book_id)
    }

    /// `<base>?bookid=<id>&chapid=<chapter>`
    pub fn chapter_url(&self, book_id: &str, chapter_id: &str) -> String {
        format!("{}?bookid={}&chapid={}", self.base_url, book_id, chapter_id)
    }

    /// Fetch and parse the whole book. The first failure aborts.
    pub fn scrape_book(
        &mut self,
        book_id: &str,
        options: &ScrapeOptions<'_>,
    ) -> Result<Book, ScraperError> {
        let book_id = validate_book_id(book_id)?;
        let landing_url = self.landing_url(book_id);
        let page = self.source.fetch_text(&landing_url)?;

        let (title, author) = extract_book_info(&page)?;
        tracing::info!(%title, %author, "found book");
        if let Some(cb) = options.on_book {
            cb(&title, &author);
        }
        let chapter_ids = extract_chapters(book_id, &page)?;
        tracing::debug!(count = chapter_ids.len(), "chapter references");

        let total = chapter_ids.len();
        let mut chapters = Vec::with_capacity(chapter_ids.len());
        for (i, chapter_id) in chapter_ids.iter().enumerate() {
            let url = self.chapter_url(book_id, chapter_id);
            let chapter_page = self.source.fetch_text(&url)?;
            let chapter = extract_chapter_content(&chapter_page, &title)?;
            tracing::info!(index = i + 1, total, title = %chapter.title, "retrieved chapter");
            if let Some(p) = options.progress {
                p(i + 1, total, &chapter.title);
            }
            chapters.push(chapter);
        }

        Ok(Book::new(
            BookMetadata {
                title,
                author,
                source_id: landing_url,
            },
            chapters,
        ))
    }
}
