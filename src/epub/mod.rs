//! EPUB writer. Consumes a [Book] and emits the fixed EPUB 2 layout (mimetype, container, OPF,
//! NCX, title page, chapters) into a zip archive or an equivalent directory tree.

mod sink;

pub use sink::{DirSink, PackageSink, ZipSink};

use crate::model::Book;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

const MIMETYPE: &[u8] = b"application/epub+zip";
const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\"?><container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\"><rootfiles><rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/></rootfiles></container>";
const OEBPS_PREFIX: &str = "OEBPS/";

static RE_UNSAFE_PATH_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\-_.() ]").expect("valid path sanitizer regex"));

/// Where the package goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Single `.epub` zip file. An existing file is overwritten.
    #[default]
    Epub,
    /// Directory tree with the same relative paths. An existing directory is an error.
    Directory,
}

/// Errors from the package writer. Maps to CLI exit code 3.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Output already exists: {path}. Remove it or choose another output directory.")]
    OutputExists { path: PathBuf },

    #[error("Failed to create output: {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Replace every character outside letters, digits, `-`, `_`, `.`, `(`, `)` and space with a space.
pub fn sanitize_title(title: &str) -> String {
    RE_UNSAFE_PATH_CHARS.replace_all(title, " ").into_owned()
}

/// File or directory stem for a book title. Falls back to `book` only when the sanitized
/// title is empty or a path component of its own (`.`, `..`).
pub fn output_stem(title: &str) -> String {
    let s = sanitize_title(title);
    match s.as_str() {
        "" | "." | ".." => "book".to_string(),
        _ => s,
    }
}

/// Output path for a book in `out_dir`: `<stem>.epub` or `<stem>/`.
pub fn output_path(book: &Book, out_dir: &Path, mode: OutputMode) -> PathBuf {
    let stem = output_stem(book.title());
    match mode {
        OutputMode::Epub => out_dir.join(format!("{}.epub", stem)),
        OutputMode::Directory => out_dir.join(stem),
    }
}

/// Write `book` into `out_dir` using `mode`. Returns the path written.
pub fn write_book(book: &Book, out_dir: &Path, mode: OutputMode) -> Result<PathBuf, EpubError> {
    let path = output_path(book, out_dir, mode);
    match mode {
        OutputMode::Epub => {
            let mut sink = ZipSink::create(&path)?;
            write_package(book, &mut sink)?;
            sink.finish()?;
        }
        OutputMode::Directory => {
            let mut sink = DirSink::create(&path)?;
            write_package(book, &mut sink)?;
            sink.finish()?;
        }
    }
    tracing::info!(path = %path.display(), chapters = book.chapters.len(), "wrote package");
    Ok(path)
}

/// Emit every package entry, in order, into `sink`.
pub fn write_package(book: &Book, sink: &mut dyn PackageSink) -> Result<(), EpubError> {
    // Mimetype first, uncompressed.
    sink.add_entry("mimetype", MIMETYPE, false)?;
    sink.add_entry("META-INF/container.xml", CONTAINER_XML, true)?;
    sink.add_entry(
        &format!("{}content.opf", OEBPS_PREFIX),
        content_opf(book).as_bytes(),
        true,
    )?;
    sink.add_entry(
        &format!("{}toc.ncx", OEBPS_PREFIX),
        toc_ncx(book).as_bytes(),
        true,
    )?;
    sink.add_entry(
        &format!("{}title.xhtml", OEBPS_PREFIX),
        title_page(book).as_bytes(),
        true,
    )?;
    for (i, ch) in book.chapters.iter().enumerate() {
        let html = format!(
            "<html>\n\t<head>\n\t\t<title>{}</title>\n\t</head>\n\t<body>\n\t\t<center><h1>{}</h1></center>\n\t\t{}\n\t</body>\n</html>",
            ch.title, ch.title, ch.body
        );
        sink.add_entry(
            &format!("{}{}", OEBPS_PREFIX, chapter_file(i)),
            html.as_bytes(),
            true,
        )?;
    }
    Ok(())
}

/// Manifest/NCX id for the chapter at 0-based `i`.
fn chapter_id(i: usize) -> String {
    format!("chapter{}", i)
}

/// Chapter file names are 1-based.
fn chapter_file(i: usize) -> String {
    format!("chapter{}.xhtml", i + 1)
}

fn content_opf(book: &Book) -> String {
    let mut opf = String::from("<?xml version=\"1.0\"?><package version=\"2.0\" xmlns=\"http://www.idpf.org/2007/opf\" unique-identifier=\"BookId\"><metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:opf=\"http://www.idpf.org/2007/opf\"><dc:title>");
    opf.push_str(book.title());
    opf.push_str("</dc:title><dc:creator opf:role=\"aut\">");
    opf.push_str(book.author());
    opf.push_str("</dc:creator><dc:language>en-US</dc:language><dc:identifier id=\"BookId\">urn:uuid:");
    opf.push_str(&book.metadata.source_id);
    opf.push_str("</dc:identifier></metadata>");

    opf.push_str("<manifest><item id=\"ncx\" href=\"toc.ncx\" media-type=\"text/xml\" /><item id=\"title\" href=\"title.xhtml\" media-type=\"application/xhtml+xml\"/>");
    for i in 0..book.chapters.len() {
        opf.push_str(&format!(
            "<item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>",
            chapter_id(i),
            chapter_file(i)
        ));
    }
    opf.push_str("</manifest><spine toc=\"ncx\"><itemref idref=\"title\"/>");
    for i in 0..book.chapters.len() {
        opf.push_str(&format!("<itemref idref=\"{}\"/>", chapter_id(i)));
    }
    opf.push_str("</spine></package>");
    opf
}

fn toc_ncx(book: &Book) -> String {
    let mut ncx = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\"><head><meta name=\"dtb:uid\" content=\"{}\"/><meta name=\"dtb:depth\" content=\"1\"/><meta name=\"dtb:totalPageCount\" content=\"0\"/><meta name=\"dtb:maxPageNumber\" content=\"0\"/></head><docTitle><text>{}</text></docTitle><navMap><navPoint id=\"title\" playOrder=\"1\"><navLabel><text>Title Page</text></navLabel><content src=\"title.xhtml\"/></navPoint>",
        book.metadata.source_id,
        book.title()
    );
    for (i, ch) in book.chapters.iter().enumerate() {
        ncx.push_str(&format!(
            "<navPoint id=\"{}\" playOrder=\"{}\"><navLabel><text>{}</text></navLabel><content src=\"{}\"/></navPoint>",
            chapter_id(i),
            i + 2,
            ch.title,
            chapter_file(i)
        ));
    }
    ncx.push_str("</navMap></ncx>");
    ncx
}

fn title_page(book: &Book) -> String {
    format!(
        "<html>\n\t<head>\n\t\t<title>{}</title>\n\t</head>\n\t<body>\n\t\t<center><h1>{}</h1>\n\t\t<h2>by {}</h2></center>\n\t</body>\n</html>",
        book.title(),
        book.title(),
        book.author()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookMetadata, Chapter};
    use std::io::Read;
    use zip::read::ZipArchive;

    fn book_with(chapters: &[&str]) -> Book {
        Book::new(
            BookMetadata {
                title: "Test Book".to_string(),
                author: "Test Author".to_string(),
                source_id: "http://books.test/?bookid=1".to_string(),
            },
            chapters
                .iter()
                .map(|t| Chapter {
                    title: t.to_string(),
                    body: format!("<p>{} body</p>", t),
                })
                .collect(),
        )
    }

    fn read_entry(zip: &mut ZipArchive<std::fs::File>, name: &str) -> String {
        let mut s = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn sanitize_title_replaces_unsafe_chars() {
        assert_eq!(
            sanitize_title("Jacob's Well: A Study"),
            "Jacob s Well  A Study"
        );
        assert_eq!(sanitize_title("a/b\\c"), "a b c");
        assert_eq!(sanitize_title("Vol. 1 (rev_2)-x"), "Vol. 1 (rev_2)-x");
    }

    #[test]
    fn sanitize_title_is_idempotent() {
        for t in ["Jacob's Well: A Study", "../../etc/passwd", "Ünïcødé & <tags>", ""] {
            let once = sanitize_title(t);
            assert_eq!(sanitize_title(&once), once);
        }
    }

    #[test]
    fn output_stem_never_escapes_out_dir() {
        assert_eq!(output_stem(""), "book");
        assert_eq!(output_stem("."), "book");
        assert_eq!(output_stem(".."), "book");
        assert_eq!(output_stem("..."), "...");
        assert_eq!(output_stem(". ."), ". .");
        assert_eq!(output_stem("///"), "   ");
        assert_eq!(output_stem("../x"), ".. x");
        assert_eq!(output_stem("My Book"), "My Book");
    }

    #[test]
    fn zero_chapters_emits_structure_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_book(&book_with(&[]), dir.path(), OutputMode::Epub).unwrap();
        assert_eq!(path, dir.path().join("Test Book.epub"));
        let mut zip = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        assert_eq!(names.len(), 5);
        for n in [
            "mimetype",
            "META-INF/container.xml",
            "OEBPS/content.opf",
            "OEBPS/toc.ncx",
            "OEBPS/title.xhtml",
        ] {
            assert!(names.iter().any(|x| x == n), "missing {}", n);
        }
        let ncx = read_entry(&mut zip, "OEBPS/toc.ncx");
        assert!(ncx.contains("<navPoint id=\"title\" playOrder=\"1\">"));
        assert_eq!(ncx.matches("<navPoint").count(), 1);
        let opf = read_entry(&mut zip, "OEBPS/content.opf");
        assert!(opf.contains("<spine toc=\"ncx\"><itemref idref=\"title\"/></spine>"));
    }

    #[test]
    fn two_chapters_play_order_and_naming() {
        let dir = tempfile::tempdir().unwrap();
        let path =
            write_book(&book_with(&["Intro", "Conclusion"]), dir.path(), OutputMode::Epub).unwrap();
        let mut zip = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();

        let ncx = read_entry(&mut zip, "OEBPS/toc.ncx");
        assert!(ncx.contains(
            "<navPoint id=\"chapter0\" playOrder=\"2\"><navLabel><text>Intro</text></navLabel><content src=\"chapter1.xhtml\"/></navPoint>"
        ));
        assert!(ncx.contains(
            "<navPoint id=\"chapter1\" playOrder=\"3\"><navLabel><text>Conclusion</text></navLabel><content src=\"chapter2.xhtml\"/></navPoint>"
        ));

        let opf = read_entry(&mut zip, "OEBPS/content.opf");
        assert!(opf.contains("<item id=\"chapter0\" href=\"chapter1.xhtml\""));
        assert!(opf.contains("<item id=\"chapter1\" href=\"chapter2.xhtml\""));
        assert!(opf.contains(
            "<itemref idref=\"title\"/><itemref idref=\"chapter0\"/><itemref idref=\"chapter1\"/>"
        ));
        assert!(opf.contains("<dc:identifier id=\"BookId\">urn:uuid:http://books.test/?bookid=1</dc:identifier>"));
        assert!(opf.contains("<dc:language>en-US</dc:language>"));

        let ch1 = read_entry(&mut zip, "OEBPS/chapter1.xhtml");
        assert_eq!(
            ch1,
            "<html>\n\t<head>\n\t\t<title>Intro</title>\n\t</head>\n\t<body>\n\t\t<center><h1>Intro</h1></center>\n\t\t<p>Intro body</p>\n\t</body>\n</html>"
        );
        assert!(read_entry(&mut zip, "OEBPS/chapter2.xhtml").contains("Conclusion body"));
        assert!(zip.by_name("OEBPS/chapter0.xhtml").is_err());
    }

    #[test]
    fn container_xml_exact() {
        assert_eq!(
            std::str::from_utf8(CONTAINER_XML).unwrap(),
            r#"<?xml version="1.0"?><container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container"><rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles></container>"#
        );
    }

    #[test]
    fn content_opf_exact_for_one_chapter() {
        let book = book_with(&["Intro"]);
        assert_eq!(
            content_opf(&book),
            concat!(
                r#"<?xml version="1.0"?><package version="2.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="BookId">"#,
                r#"<metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">"#,
                r#"<dc:title>Test Book</dc:title><dc:creator opf:role="aut">Test Author</dc:creator>"#,
                r#"<dc:language>en-US</dc:language><dc:identifier id="BookId">urn:uuid:http://books.test/?bookid=1</dc:identifier></metadata>"#,
                r#"<manifest><item id="ncx" href="toc.ncx" media-type="text/xml" />"#,
                r#"<item id="title" href="title.xhtml" media-type="application/xhtml+xml"/>"#,
                r#"<item id="chapter0" href="chapter1.xhtml" media-type="application/xhtml+xml"/></manifest>"#,
                r#"<spine toc="ncx"><itemref idref="title"/><itemref idref="chapter0"/></spine></package>"#,
            )
        );
    }

    #[test]
    fn toc_ncx_exact_for_one_chapter() {
        let book = book_with(&["Intro"]);
        assert_eq!(
            toc_ncx(&book),
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?><ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">"#,
                r#"<head><meta name="dtb:uid" content="http://books.test/?bookid=1"/><meta name="dtb:depth" content="1"/>"#,
                r#"<meta name="dtb:totalPageCount" content="0"/><meta name="dtb:maxPageNumber" content="0"/></head>"#,
                r#"<docTitle><text>Test Book</text></docTitle><navMap>"#,
                r#"<navPoint id="title" playOrder="1"><navLabel><text>Title Page</text></navLabel><content src="title.xhtml"/></navPoint>"#,
                r#"<navPoint id="chapter0" playOrder="2"><navLabel><text>Intro</text></navLabel><content src="chapter1.xhtml"/></navPoint>"#,
                r#"</navMap></ncx>"#,
            )
        );
    }

    #[test]
    fn mimetype_first_and_stored() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_book(&book_with(&["A"]), dir.path(), OutputMode::Epub).unwrap();
        let mut zip = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let first = zip.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), zip::CompressionMethod::Stored);
        drop(first);
        assert_eq!(read_entry(&mut zip, "mimetype"), "application/epub+zip");
        let container = read_entry(&mut zip, "META-INF/container.xml");
        assert!(container.contains("full-path=\"OEBPS/content.opf\""));
    }

    #[test]
    fn title_page_credits_author() {
        let page = title_page(&book_with(&[]));
        assert_eq!(
            page,
            "<html>\n\t<head>\n\t\t<title>Test Book</title>\n\t</head>\n\t<body>\n\t\t<center><h1>Test Book</h1>\n\t\t<h2>by Test Author</h2></center>\n\t</body>\n</html>"
        );
    }

    #[test]
    fn directory_mode_mirrors_zip_layout() {
        let dir = tempfile::tempdir().unwrap();
        let book = book_with(&["Intro", "Conclusion"]);
        let tree = write_book(&book, dir.path(), OutputMode::Directory).unwrap();
        assert_eq!(tree, dir.path().join("Test Book"));
        let epub = write_book(&book, dir.path(), OutputMode::Epub).unwrap();
        let mut zip = ZipArchive::new(std::fs::File::open(&epub).unwrap()).unwrap();
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        for name in &names {
            let on_disk = std::fs::read_to_string(tree.join(name)).unwrap();
            assert_eq!(on_disk, read_entry(&mut zip, name), "{} differs", name);
        }
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn epub_mode_rerun_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        write_book(&book_with(&["A", "B", "C"]), dir.path(), OutputMode::Epub).unwrap();
        let path = write_book(&book_with(&["A"]), dir.path(), OutputMode::Epub).unwrap();
        let zip = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(zip.len(), 6);
    }

    #[test]
    fn directory_mode_rerun_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let book = book_with(&["A"]);
        write_book(&book, dir.path(), OutputMode::Directory).unwrap();
        let result = write_book(&book, dir.path(), OutputMode::Directory);
        match result {
            Err(EpubError::OutputExists { path }) => assert_eq!(path, dir.path().join("Test Book")),
            other => panic!("expected OutputExists, got {:?}", other),
        }
    }

    #[test]
    fn missing_out_dir_is_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("does-not-exist");
        let result = write_book(&book_with(&["A"]), &out, OutputMode::Epub);
        assert!(matches!(result, Err(EpubError::CreateFile { .. })));
    }
}
