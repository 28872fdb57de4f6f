//! Chapter scraping: page fetcher, extractor, pacing, and the range orchestrator.

mod client;
mod error;
mod extract;
mod observer;
mod pacing;

pub use client::{
    chapter_url, ChapterClient, ChapterClientBuilder, DEFAULT_BASE_URL, DEFAULT_PATH_TEMPLATE,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
pub use error::{ChapterError, FailureKind, LayoutError, Region, ScraperError};
pub use extract::{ExtractionSchema, RegionLocators};
pub use observer::{RunObserver, TracingObserver};
pub use pacing::{DelayRange, Pacer, ThreadSleeper};

use crate::model::ChapterRecord;
use rand::Rng;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Source of raw chapter pages. [ChapterClient] fetches over HTTP; closures work for tests.
pub trait PageFetcher {
    fn fetch(&mut self, chapter: u32) -> Result<Vec<u8>, ChapterError>;
}

impl<F> PageFetcher for F
where
    F: FnMut(u32) -> Result<Vec<u8>, ChapterError>,
{
    fn fetch(&mut self, chapter: u32) -> Result<Vec<u8>, ChapterError> {
        self(chapter)
    }
}

/// Inclusive range of chapter numbers, processed in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRange {
    start: u32,
    end: u32,
}

impl ChapterRange {
    pub fn new(start: u32, end: u32) -> Result<Self, ScraperError> {
        if start > end {
            return Err(ScraperError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of chapters requested.
    pub fn count(&self) -> u32 {
        (self.end - self.start).saturating_add(1)
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// Options for a range run: which chapters, how long to pause, where pauses and events go.
pub struct ScrapeOptions<'a> {
    pub range: ChapterRange,
    pub delay: DelayRange,
    pub pacer: &'a mut dyn Pacer,
    pub observer: &'a mut dyn RunObserver,
}

/// Fetch then extract one chapter.
pub fn scrape_chapter(
    fetcher: &mut dyn PageFetcher,
    schema: &ExtractionSchema,
    chapter: u32,
) -> Result<ChapterRecord, ChapterError> {
    let raw = fetcher.fetch(chapter)?;
    schema
        .parse(&raw)
        .map_err(|source| ChapterError::Layout { chapter, source })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic while processing chapter".to_string()
    }
}

/// Process every chapter of the range in order, skipping failed chapters.
///
/// After each successful chapter the run pauses for a duration drawn from `options.delay`;
/// failed chapters move on immediately. Returns the records in ascending chapter order, or
/// [ScraperError::NoChaptersRetrieved] if none succeeded.
pub fn run_range<R: Rng>(
    fetcher: &mut dyn PageFetcher,
    schema: &ExtractionSchema,
    options: ScrapeOptions<'_>,
    rng: &mut R,
) -> Result<Vec<ChapterRecord>, ScraperError> {
    let ScrapeOptions {
        range,
        delay,
        pacer,
        observer,
    } = options;
    let total = range.count();
    let mut records = Vec::new();

    for (position, chapter) in range.iter().enumerate() {
        observer.chapter_started(chapter, position as u32 + 1, total);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            scrape_chapter(&mut *fetcher, schema, chapter)
        }))
        .unwrap_or_else(|payload| {
            Err(ChapterError::Unexpected {
                chapter,
                message: panic_message(payload.as_ref()),
            })
        });

        match outcome {
            Ok(record) => {
                observer.chapter_retrieved(chapter, &record);
                records.push(record);
                let pause = delay.sample(rng);
                observer.paced(pause);
                pacer.pause(pause);
            }
            Err(e) => observer.chapter_skipped(&e),
        }
    }

    observer.finished(records.len(), total);
    if records.is_empty() {
        return Err(ScraperError::NoChaptersRetrieved {
            start: range.start(),
            end: range.end(),
        });
    }
    Ok(records)
}
