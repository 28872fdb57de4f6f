//! Error types for fetching and extracting chapters, and for whole-run failures.

use thiserror::Error;

/// Structural region of a chapter page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Number,
    Title,
    Content,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Region::Number => "chapter number",
            Region::Title => "chapter title",
            Region::Content => "content container",
        };
        f.write_str(name)
    }
}

/// The page structure no longer matches the extraction schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Unexpected layout: {0} not found.")]
    MissingRegion(Region),

    #[error("Unexpected layout: {0} is empty.")]
    EmptyRegion(Region),

    #[error("Unexpected layout: content container has no readable paragraphs.")]
    NoParagraphs,
}

/// Coarse classification of a per-chapter failure. Drives log level and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    LayoutMismatch,
    Unexpected,
}

/// Failure while processing a single chapter. Always recovered by skipping the chapter.
#[derive(Debug, Error)]
pub enum ChapterError {
    #[error("Network error on chapter {chapter}: could not reach {url}: {source}")]
    Network {
        chapter: u32,
        url: String,
        source: reqwest::Error,
    },

    #[error("HTTP {status} on chapter {chapter}: {url}")]
    HttpStatus {
        chapter: u32,
        status: u16,
        url: String,
    },

    #[error("Failed to read body of chapter {chapter} at {url}: {source}")]
    BodyRead {
        chapter: u32,
        url: String,
        source: reqwest::Error,
    },

    #[error("Layout mismatch on chapter {chapter}: {source}")]
    Layout {
        chapter: u32,
        #[source]
        source: LayoutError,
    },

    #[error("Unexpected error on chapter {chapter}: {message}")]
    Unexpected { chapter: u32, message: String },
}

impl ChapterError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ChapterError::Network { .. }
            | ChapterError::HttpStatus { .. }
            | ChapterError::BodyRead { .. } => FailureKind::Transport,
            ChapterError::Layout { .. } => FailureKind::LayoutMismatch,
            ChapterError::Unexpected { .. } => FailureKind::Unexpected,
        }
    }

    pub fn chapter(&self) -> u32 {
        match self {
            ChapterError::Network { chapter, .. }
            | ChapterError::HttpStatus { chapter, .. }
            | ChapterError::BodyRead { chapter, .. }
            | ChapterError::Layout { chapter, .. }
            | ChapterError::Unexpected { chapter, .. } => *chapter,
        }
    }
}

/// Run-level errors: bad setup, or nothing retrieved at all.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Invalid base URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Invalid path template '{template}': it must contain the {{n}} placeholder.")]
    InvalidTemplate { template: String },

    #[error("Invalid {name} locator {selector:?}: {reason}")]
    InvalidLocator {
        name: &'static str,
        selector: String,
        reason: String,
    },

    #[error("Invalid chapter range: start ({start}) must be <= end ({end}).")]
    InvalidRange { start: u32, end: u32 },

    #[error("Invalid delay range: minimum {min:?} is greater than maximum {max:?}.")]
    InvalidDelay {
        min: std::time::Duration,
        max: std::time::Duration,
    },

    #[error("Invalid delay: {value} is not a usable number of seconds ({reason}).")]
    InvalidDelaySeconds { value: f64, reason: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("No chapters could be retrieved from range {start}-{end}.")]
    NoChaptersRetrieved { start: u32, end: u32 },
}
