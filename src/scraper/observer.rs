//! Run events. The orchestrator reports here instead of logging directly.

use crate::model::ChapterRecord;
use crate::scraper::error::{ChapterError, FailureKind};
use std::time::Duration;

/// Receives progress events from [run_range](crate::scraper::run_range).
///
/// All methods default to no-ops so implementors pick the events they care about.
pub trait RunObserver {
    /// `position` is 1-based within the requested range of `total` chapters.
    fn chapter_started(&mut self, _chapter: u32, _position: u32, _total: u32) {}

    fn chapter_retrieved(&mut self, _chapter: u32, _record: &ChapterRecord) {}

    fn chapter_skipped(&mut self, _error: &ChapterError) {}

    fn paced(&mut self, _delay: Duration) {}

    fn finished(&mut self, _retrieved: usize, _requested: u32) {}
}

/// Logs run events through `tracing`: info for progress, warn for expected failures,
/// error for unclassified ones.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn chapter_started(&mut self, chapter: u32, position: u32, total: u32) {
        tracing::info!(chapter, "Fetching chapter {} ({}/{})", chapter, position, total);
    }

    fn chapter_retrieved(&mut self, chapter: u32, record: &ChapterRecord) {
        tracing::debug!(
            chapter,
            paragraphs = record.paragraphs().len(),
            "Parsed {} - {}",
            record.number(),
            record.title()
        );
    }

    fn chapter_skipped(&mut self, error: &ChapterError) {
        let chapter = error.chapter();
        match error.kind() {
            FailureKind::Transport | FailureKind::LayoutMismatch => {
                tracing::warn!(chapter, "{}", error)
            }
            FailureKind::Unexpected => tracing::error!(chapter, "{}", error),
        }
    }

    fn paced(&mut self, delay: Duration) {
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Pausing before next request");
    }

    fn finished(&mut self, retrieved: usize, requested: u32) {
        if retrieved == 0 {
            tracing::error!("No chapter was retrieved successfully.");
        } else {
            tracing::info!("Retrieved {} of {} chapters", retrieved, requested);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::error::LayoutError;
    use std::sync::{Arc, Mutex};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Records the level of every event.
    #[derive(Clone, Default)]
    struct Levels(Arc<Mutex<Vec<Level>>>);

    impl<S: Subscriber> Layer<S> for Levels {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    fn skipped_level(error: ChapterError) -> Vec<Level> {
        let levels = Levels::default();
        let subscriber = tracing_subscriber::registry().with(levels.clone());
        tracing::subscriber::with_default(subscriber, || {
            TracingObserver.chapter_skipped(&error);
        });
        let captured = levels.0.lock().unwrap().clone();
        captured
    }

    #[test]
    fn skipped_chapters_log_at_level_for_their_kind() {
        let transport = ChapterError::HttpStatus {
            chapter: 1,
            status: 503,
            url: "https://example.com/1/".to_string(),
        };
        assert_eq!(skipped_level(transport), [Level::WARN]);

        let layout = ChapterError::Layout {
            chapter: 2,
            source: LayoutError::NoParagraphs,
        };
        assert_eq!(skipped_level(layout), [Level::WARN]);

        let unexpected = ChapterError::Unexpected {
            chapter: 3,
            message: "boom".to_string(),
        };
        assert_eq!(skipped_level(unexpected), [Level::ERROR]);
    }

    #[test]
    fn empty_run_finishes_with_error() {
        let levels = Levels::default();
        let subscriber = tracing_subscriber::registry().with(levels.clone());
        tracing::subscriber::with_default(subscriber, || {
            TracingObserver.finished(0, 4);
            TracingObserver.finished(3, 4);
        });
        assert_eq!(*levels.0.lock().unwrap(), [Level::ERROR, Level::INFO]);
    }
}
