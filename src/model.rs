//! Canonical data model for one scraped chapter.
//!
//! Both exporters consume a slice of [ChapterRecord] in retrieval order.

use thiserror::Error;

/// Which field of a [ChapterRecord] failed validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("chapter number is empty")]
    EmptyNumber,

    #[error("chapter title is empty")]
    EmptyTitle,

    #[error("chapter has no paragraphs")]
    NoParagraphs,
}

/// One chapter as extracted from its page.
///
/// Fields are private so a record can only exist with a non-empty number, a non-empty
/// title and at least one non-empty paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRecord {
    number: String,
    title: String,
    paragraphs: Vec<String>,
}

impl ChapterRecord {
    /// Build a record. Number and title are trimmed; paragraphs are trimmed and blank ones
    /// dropped, keeping document order.
    pub fn new(
        number: impl Into<String>,
        title: impl Into<String>,
        paragraphs: impl IntoIterator<Item = String>,
    ) -> Result<Self, RecordError> {
        let number = number.into().trim().to_string();
        if number.is_empty() {
            return Err(RecordError::EmptyNumber);
        }
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(RecordError::EmptyTitle);
        }
        let paragraphs: Vec<String> = paragraphs
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if paragraphs.is_empty() {
            return Err(RecordError::NoParagraphs);
        }
        Ok(Self {
            number,
            title,
            paragraphs,
        })
    }

    /// Display label as found on the page (e.g. "Capítulo 487").
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_and_drops_blank_paragraphs() -> Result<(), RecordError> {
        let record = ChapterRecord::new(
            "  Capítulo 1 ",
            "\nO Começo\t",
            vec![
                " First. ".to_string(),
                "   ".to_string(),
                String::new(),
                "Second.".to_string(),
            ],
        )?;
        assert_eq!(record.number(), "Capítulo 1");
        assert_eq!(record.title(), "O Começo");
        assert_eq!(record.paragraphs(), ["First.", "Second."]);
        Ok(())
    }

    #[test]
    fn new_rejects_empty_number() {
        let result = ChapterRecord::new(" ", "Title", vec!["Body".to_string()]);
        assert_eq!(result, Err(RecordError::EmptyNumber));
    }

    #[test]
    fn new_rejects_empty_title() {
        let result = ChapterRecord::new("1", "", vec!["Body".to_string()]);
        assert_eq!(result, Err(RecordError::EmptyTitle));
    }

    #[test]
    fn new_rejects_whitespace_only_paragraphs() {
        let result = ChapterRecord::new("1", "Title", vec![" \n ".to_string()]);
        assert_eq!(result, Err(RecordError::NoParagraphs));
        let result = ChapterRecord::new("1", "Title", Vec::new());
        assert_eq!(result, Err(RecordError::NoParagraphs));
    }
}
