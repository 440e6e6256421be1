//! Regex extraction over raw page text. Every pattern takes its first match only,
//! except the chapter-reference scan which collects all of them.

use crate::model::Chapter;
use crate::scraper::ScraperError;
use regex::Regex;
use std::sync::LazyLock;

static RE_BOOK_INFO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>(.+) by (.+)</title>").expect("valid book info regex"));
static RE_CHAPTER_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<div id='content_readable'>(.*?)</div>").expect("valid chapter body regex")
});

/// Pull `(title, author)` out of the landing page `<title>` element.
///
/// Captures are returned verbatim: no trimming, no entity decoding.
pub fn extract_book_info(page: &str) -> Result<(String, String), ScraperError> {
    let caps = RE_BOOK_INFO
        .captures(page)
        .ok_or(ScraperError::ParseBookInfo)?;
    match (caps.get(1), caps.get(2)) {
        (Some(title), Some(author)) => Ok((title.as_str().to_string(), author.as_str().to_string())),
        _ => Err(ScraperError::ParseBookInfo),
    }
}

/// Build the chapter-reference pattern for a book id.
pub(crate) fn chapter_ref_regex(book_id: &str) -> Result<Regex, ScraperError> {
    let pattern = format!(r"bookid={}&chapid=([0-9]+)", regex::escape(book_id));
    Regex::new(&pattern).map_err(|e| ScraperError::InvalidBookId {
        input: book_id.to_string(),
        reason: e.to_string(),
    })
}

/// Every chapter id referenced on the landing page, in textual order.
///
/// Duplicates are kept: a chapter linked twice is fetched twice.
pub fn extract_chapters(book_id: &str, page: &str) -> Result<Vec<String>, ScraperError> {
    let re = chapter_ref_regex(book_id)?;
    Ok(re
        .captures_iter(page)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect())
}

/// Pull the chapter title (scoped to the book title) and the `content_readable` body.
pub fn extract_chapter_content(page: &str, book_title: &str) -> Result<Chapter, ScraperError> {
    let title_re = Regex::new(&format!(
        r"<title>{} - (.+)</title>",
        regex::escape(book_title)
    ))
    .map_err(|_| ScraperError::ParseChapterTitle {
        book_title: book_title.to_string(),
    })?;
    let title = title_re
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ScraperError::ParseChapterTitle {
            book_title: book_title.to_string(),
        })?;
    let body = RE_CHAPTER_BODY
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(ScraperError::ParseChapterBody)?;
    Ok(Chapter { title, body })
}
