//! chapterscrape: CLI scraper for web novel chapter ranges, outputting plain text and EPUB.

pub mod cli;
pub mod config;
pub mod epub;
pub mod formats;
pub mod model;
pub mod scraper;

// Re-exports for CLI and consumers.
pub use epub::{write_epub, BookMetadata, EpubError};
pub use formats::{write_text, FormatError};
pub use model::{ChapterRecord, RecordError};
pub use crate::scraper::{
    run_range, scrape_chapter, ChapterClient, ChapterClientBuilder, ChapterError, ChapterRange,
    DelayRange, ExtractionSchema, FailureKind, PageFetcher, ScrapeOptions, ScraperError,
};
