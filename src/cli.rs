//! CLI parsing and orchestration. Parses args, runs scrape -> package, maps errors to exit codes.

use crate::config;
use crate::epub::{write_book, EpubError, OutputMode};
use crate::scraper::{
    validate_book_id, HttpClient, MaxwellScraper, PageSource, ScrapeOptions, ScraperError,
    DEFAULT_BASE_URL,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Epub(#[from] EpubError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Epub(_) => 3,
        }
    }
}

/// Exit code for an argument parsing failure: 0 for --help/--version, 1 for usage errors.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

#[derive(Parser, Debug)]
#[command(name = "farms-epub", version)]
#[command(about = "Fetch a Maxwell Institute book and write it as EPUB")]
#[command(
    after_help = "Config file keys (output_dir, output_mode, user_agent, timeout_secs, base_url) are read from ./farms-epub.toml or <config dir>/farms-epub/config.toml. CLI flags override config."
)]
pub struct Args {
    /// Book id, as in `?bookid=<id>` on the publications site.
    pub book_id: String,

    /// Directory to write into. Default: current directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Write an unpacked directory tree instead of a single .epub file.
    #[arg(long)]
    pub dir: bool,

    /// Publications endpoint (overrides config).
    #[arg(long)]
    pub base_url: Option<String>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and full error chain.
    #[arg(long)]
    pub verbose: bool,
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { "farms_epub=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_output_mode(s: &str) -> Result<OutputMode, String> {
    match s.to_lowercase().as_str() {
        "epub" => Ok(OutputMode::Epub),
        "directory" | "dir" => Ok(OutputMode::Directory),
        _ => Err(format!(
            "Invalid output_mode value: '{}'. Use epub or directory.",
            s
        )),
    }
}

/// Output directory must already exist; nothing is created above the package itself.
fn validate_output_dir(dir: &Path) -> Result<(), CliRunError> {
    if !dir.as_os_str().is_empty() && !dir.is_dir() {
        return Err(CliRunError::InvalidInput(format!(
            "Cannot write output: {}: directory does not exist.",
            dir.display()
        )));
    }
    Ok(())
}

/// Resolved run settings: CLI flags over config over defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub mode: OutputMode,
    pub base_url: String,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Settings {
    pub fn resolve(args: &Args, config: Option<&config::Config>) -> Result<Self, CliRunError> {
        let mode = if args.dir {
            OutputMode::Directory
        } else {
            match config.and_then(|c| c.output_mode.as_deref()) {
                Some(s) => parse_output_mode(s).map_err(CliRunError::InvalidInput)?,
                None => OutputMode::Epub,
            }
        };
        Ok(Self {
            output_dir: args
                .output_dir
                .clone()
                .or_else(|| config.and_then(|c| c.output_dir.clone()))
                .unwrap_or_else(|| PathBuf::from(".")),
            mode,
            base_url: args
                .base_url
                .clone()
                .or_else(|| config.and_then(|c| c.base_url.clone()))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            user_agent: args
                .user_agent
                .clone()
                .or_else(|| config.and_then(|c| c.user_agent.clone())),
            timeout_secs: args.timeout.or_else(|| config.and_then(|c| c.timeout_secs)),
        })
    }
}

/// Scrape `book_id` from `source` and write the package. Returns the path written.
pub fn convert<S: PageSource>(
    book_id: &str,
    source: S,
    settings: &Settings,
    options: &ScrapeOptions<'_>,
) -> Result<PathBuf, CliRunError> {
    validate_book_id(book_id).map_err(|e| CliRunError::InvalidInput(e.to_string()))?;
    validate_output_dir(&settings.output_dir)?;
    let book = MaxwellScraper::new(source, settings.base_url.as_str()).scrape_book(book_id, options)?;
    let path = write_book(&book, &settings.output_dir, settings.mode)?;
    Ok(path)
}

/// Operator progress. Draws a bar on a terminal; when the bar is hidden (stderr is not a
/// terminal) every event is written as a plain line instead. `quiet` silences everything.
pub struct Reporter<W: Write> {
    quiet: bool,
    target: fn() -> ProgressDrawTarget,
    bar: RefCell<Option<ProgressBar>>,
    out: RefCell<W>,
}

impl Reporter<std::io::Stderr> {
    pub fn stderr(quiet: bool) -> Self {
        Self::new(quiet, ProgressDrawTarget::stderr, std::io::stderr())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(quiet: bool, target: fn() -> ProgressDrawTarget, out: W) -> Self {
        Self {
            quiet,
            target,
            bar: RefCell::new(None),
            out: RefCell::new(out),
        }
    }

    pub fn book(&self, title: &str, author: &str) {
        self.line(&format!("Retrieving '{}' by {}", title, author));
    }

    pub fn chapter(&self, n: usize, total: usize, title: &str) {
        if self.quiet {
            return;
        }
        let mut state = self.bar.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = ProgressBar::with_draw_target(Some(total as u64), (self.target)());
            let style = ProgressStyle::default_bar()
                .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .progress_chars("█▉▊▋▌▍▎▏ ");
            bar.set_style(style);
            if !bar.is_hidden() {
                bar.enable_steady_tick(Duration::from_millis(80));
            }
            bar
        });
        pb.set_position(n as u64);
        pb.set_message(format!("Chapter {}/{}: {}", n, total, title));
        let text = format!("Retrieved chapter {} of {} ({})", n, total, title);
        if pb.is_hidden() {
            let _ = writeln!(self.out.borrow_mut(), "{}", text);
        } else {
            pb.println(text);
        }
    }

    /// A line outside the bar, e.g. the final `Wrote` message.
    pub fn line(&self, text: &str) {
        if !self.quiet {
            let _ = writeln!(self.out.borrow_mut(), "{}", text);
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.disable_steady_tick();
            pb.finish_and_clear();
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = Settings::resolve(args, config.as_ref())?;

    let mut builder = HttpClient::builder();
    if let Some(ua) = &settings.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    if let Some(secs) = settings.timeout_secs {
        builder = builder.timeout_secs(secs);
    }
    let client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let reporter = Reporter::stderr(args.quiet);
    let on_book = |title: &str, author: &str| reporter.book(title, author);
    let progress = |n: usize, total: usize, title: &str| reporter.chapter(n, total, title);
    let options = ScrapeOptions {
        on_book: Some(&on_book),
        progress: Some(&progress),
    };

    let result = convert(&args.book_id, client, &settings, &options);
    reporter.finish();

    let path = result?;
    reporter.line(&format!("Wrote {}", path.display()));
    Ok(())
}
