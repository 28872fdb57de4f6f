//! CLI parsing and orchestration. Parses args, merges config, scrapes the chapter range,
//! then writes the text file and the EPUB. Maps errors to exit codes.

use crate::config::{self, Config};
use crate::epub::{write_epub, BookMetadata, EpubError, DEFAULT_BOOK_TITLE};
use crate::formats::{write_text, FormatError};
use crate::model::ChapterRecord;
use crate::scraper::{
    chapter_url, run_range, ChapterClient, ChapterError, ChapterRange, DelayRange,
    ExtractionSchema, PageFetcher, Pacer, RegionLocators, RunObserver, ScrapeOptions,
    ScraperError, ThreadSleeper, TracingObserver, DEFAULT_BASE_URL, DEFAULT_PATH_TEMPLATE,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Epub(#[from] EpubError),

    #[error("{0}")]
    Format(#[from] FormatError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(ScraperError::NoChaptersRetrieved { .. }) => 2,
            CliRunError::Scraper(_) => 1,
            CliRunError::Epub(_) | CliRunError::Format(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "chapterscrape", version)]
#[command(about = "Scrape a range of web novel chapters into a text file and an EPUB")]
#[command(
    after_help = "Config file keys (base_url, path_template, user_agent, timeout_secs, delay_min_secs, delay_max_secs, output_dir, book_title, [locators]) are read from ./chapterscrape.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    /// Chapters to fetch (inclusive), e.g. 487-1262.
    #[arg(value_parser = parse_chapter_range)]
    pub chapters: (u32, u32),

    /// Plain-text output path. Default: {output_dir}/{sanitized-title}.txt
    #[arg(long)]
    pub txt: Option<PathBuf>,

    /// EPUB output path. Default: {output_dir}/{sanitized-title}.epub
    #[arg(long)]
    pub epub: Option<PathBuf>,

    /// Book title used in the EPUB metadata (default "Supreme Magus").
    #[arg(long)]
    pub title: Option<String>,

    /// Site root URL (overrides config).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Chapter path with a {n} placeholder (overrides config).
    #[arg(long)]
    pub path_template: Option<String>,

    /// Pause after each retrieved chapter, in seconds, e.g. 1-2 or 0.5-1.5 (default 1-2).
    #[arg(long, value_parser = parse_delay_range)]
    pub delay: Option<(f64, f64)>,

    /// Request timeout in seconds (overrides config; default 10).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Only log warnings and errors; no progress bar.
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and the full error chain on failure.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the URLs and output paths that would be used, without fetching anything.
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_chapter_range(s: &str) -> Result<(u32, u32), String> {
    let s = s.trim();
    let (from_str, to_str) = s.split_once('-').ok_or_else(|| {
        format!(
            "Invalid chapter range: expected 'from-to' (e.g. 1-10), got '{}'",
            s
        )
    })?;
    let from_str = from_str.trim();
    let to_str = to_str.trim();
    let from: u32 = from_str.parse().map_err(|_| {
        format!(
            "Invalid chapter range: '{}' is not a valid start chapter number",
            from_str
        )
    })?;
    let to: u32 = to_str.parse().map_err(|_| {
        format!(
            "Invalid chapter range: '{}' is not a valid end chapter number",
            to_str
        )
    })?;
    if from > to {
        return Err(format!(
            "Invalid chapter range: start ({}) must be <= end ({})",
            from, to
        ));
    }
    Ok((from, to))
}

fn parse_delay_range(s: &str) -> Result<(f64, f64), String> {
    let s = s.trim();
    let (min_str, max_str) = s.split_once('-').ok_or_else(|| {
        format!(
            "Invalid --delay: expected 'min-max' in seconds (e.g. 1-2), got '{}'",
            s
        )
    })?;
    let parse = |part: &str| -> Result<f64, String> {
        let part = part.trim();
        part.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| format!("Invalid --delay: '{}' is not a valid number of seconds", part))
    };
    let min = parse(min_str)?;
    let max = parse(max_str)?;
    if min > max {
        return Err(format!(
            "Invalid --delay: minimum ({}) must be <= maximum ({})",
            min, max
        ));
    }
    Ok((min, max))
}

/// Sanitize book title to a safe filename: lowercase, replace spaces/special with `-`.
fn sanitize_title(title: &str) -> String {
    let mut s = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    // Collapse multiple dashes and trim
    while s.contains("--") {
        s = s.replace("--", "-");
    }
    s = s.trim_matches('-').to_string();
    if s.is_empty() {
        s = "book".to_string();
    }
    s
}

/// Effective settings for one run after merging flags, config, and defaults.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub range: ChapterRange,
    pub base_url: String,
    pub path_template: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub delay: DelayRange,
    pub locators: RegionLocators,
    pub book_title: String,
    pub txt_path: PathBuf,
    pub epub_path: PathBuf,
}

/// Flags win over config; config wins over built-in defaults.
pub fn resolve_settings(args: &Args, config: Option<&Config>) -> Result<RunSettings, CliRunError> {
    let (start, end) = args.chapters;
    let range = ChapterRange::new(start, end)?;

    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.and_then(|c| c.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let path_template = args
        .path_template
        .clone()
        .or_else(|| config.and_then(|c| c.path_template.clone()))
        .unwrap_or_else(|| DEFAULT_PATH_TEMPLATE.to_string());
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.and_then(|c| c.user_agent.clone()))
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
    let timeout_secs = args
        .timeout
        .or_else(|| config.and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let defaults = DelayRange::default();
    let (delay_min, delay_max) = args.delay.unwrap_or_else(|| {
        (
            config
                .and_then(|c| c.delay_min_secs)
                .unwrap_or(defaults.min().as_secs_f64()),
            config
                .and_then(|c| c.delay_max_secs)
                .unwrap_or(defaults.max().as_secs_f64()),
        )
    });
    let delay = DelayRange::from_secs_f64(delay_min, delay_max)?;

    let locators = config
        .and_then(|c| c.locators.clone())
        .unwrap_or_default();
    let book_title = args
        .title
        .clone()
        .or_else(|| config.and_then(|c| c.book_title.clone()))
        .unwrap_or_else(|| DEFAULT_BOOK_TITLE.to_string());
    if book_title.trim().is_empty() {
        return Err(CliRunError::InvalidInput(
            "Book title must not be empty.".to_string(),
        ));
    }

    let output_dir = config
        .and_then(|c| c.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let base_name = sanitize_title(&book_title);
    let txt_path = args
        .txt
        .clone()
        .unwrap_or_else(|| output_dir.join(format!("{}.txt", base_name)));
    let epub_path = args
        .epub
        .clone()
        .unwrap_or_else(|| output_dir.join(format!("{}.epub", base_name)));
    if txt_path == epub_path {
        return Err(CliRunError::InvalidInput(format!(
            "Text and EPUB outputs must differ (both are {}).",
            txt_path.display()
        )));
    }

    Ok(RunSettings {
        range,
        base_url,
        path_template,
        user_agent,
        timeout_secs,
        delay,
        locators,
        book_title,
        txt_path,
        epub_path,
    })
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the flag-derived level.
pub fn init_logging(args: &Args) {
    let default_filter = if args.quiet {
        "chapterscrape=warn"
    } else if args.verbose {
        "chapterscrape=debug"
    } else {
        "chapterscrape=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Progress bar around another observer. Log lines print with the bar suspended.
struct ProgressObserver<O> {
    bar: ProgressBar,
    inner: O,
}

impl<O: RunObserver> ProgressObserver<O> {
    fn new(total: u32, inner: O) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .progress_chars("█▉▊▋▌▍▎▏ ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar, inner }
    }
}

impl<O: RunObserver> RunObserver for ProgressObserver<O> {
    fn chapter_started(&mut self, chapter: u32, position: u32, total: u32) {
        self.bar
            .suspend(|| self.inner.chapter_started(chapter, position, total));
        self.bar.set_message(format!("Chapter {}", chapter));
    }

    fn chapter_retrieved(&mut self, chapter: u32, record: &ChapterRecord) {
        self.bar
            .suspend(|| self.inner.chapter_retrieved(chapter, record));
        self.bar.inc(1);
    }

    fn chapter_skipped(&mut self, error: &ChapterError) {
        self.bar.suspend(|| self.inner.chapter_skipped(error));
        self.bar.inc(1);
    }

    fn paced(&mut self, delay: Duration) {
        self.bar.suspend(|| self.inner.paced(delay));
    }

    fn finished(&mut self, retrieved: usize, requested: u32) {
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
        self.inner.finished(retrieved, requested);
    }
}

/// Scrape the configured range, then write the text file and the EPUB, in that order.
///
/// Nothing is written when no chapter was retrieved. A text export failure stops the run
/// before the EPUB is attempted. Returns the number of chapters exported.
pub fn scrape_and_export<R: Rng>(
    fetcher: &mut dyn PageFetcher,
    schema: &ExtractionSchema,
    settings: &RunSettings,
    pacer: &mut dyn Pacer,
    observer: &mut dyn RunObserver,
    rng: &mut R,
) -> Result<usize, CliRunError> {
    let options = ScrapeOptions {
        range: settings.range,
        delay: settings.delay,
        pacer,
        observer,
    };
    let records = run_range(fetcher, schema, options, rng)?;

    tracing::info!(
        "Saving {} chapters as text: {}",
        records.len(),
        settings.txt_path.display()
    );
    write_text(&records, &settings.txt_path)?;

    tracing::info!("Creating EPUB: {}", settings.epub_path.display());
    write_epub(
        &records,
        &settings.epub_path,
        &BookMetadata::new(settings.book_title.clone()),
    )?;

    tracing::info!("Done.");
    Ok(records.len())
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = resolve_settings(args, config.as_ref())?;
    let schema = ExtractionSchema::new(&settings.locators)?;

    let mut client = ChapterClient::builder()
        .base_url(settings.base_url.clone())
        .path_template(settings.path_template.clone())
        .user_agent(settings.user_agent.clone())
        .timeout_secs(settings.timeout_secs)
        .build()?;

    if args.dry_run {
        let range = settings.range;
        eprintln!("Chapters: {}", range.count());
        eprintln!(
            "First: {}",
            chapter_url(&settings.base_url, &settings.path_template, range.start())
        );
        eprintln!(
            "Last: {}",
            chapter_url(&settings.base_url, &settings.path_template, range.end())
        );
        eprintln!("Text output: {}", settings.txt_path.display());
        eprintln!("EPUB output: {}", settings.epub_path.display());
        return Ok(());
    }

    let mut tracing_observer = TracingObserver;
    let mut progress_observer;
    let observer: &mut dyn RunObserver = if args.quiet {
        &mut tracing_observer
    } else {
        progress_observer = ProgressObserver::new(settings.range.count(), TracingObserver);
        &mut progress_observer
    };

    scrape_and_export(
        &mut client,
        &schema,
        &settings,
        &mut ThreadSleeper,
        observer,
        &mut rand::thread_rng(),
    )?;
    Ok(())
}
