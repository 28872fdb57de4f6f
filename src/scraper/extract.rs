//! Chapter extractor. Locates the number, title and content regions of a chapter page and
//! builds a [ChapterRecord].
//!
//! Locators are CSS selectors. The defaults mirror the absolute positions of the source
//! site's current layout; any change there means the defaults must change too.

use crate::model::{ChapterRecord, RecordError};
use crate::scraper::error::{LayoutError, Region, ScraperError};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

const ARTICLE_BODY: &str = "html > body > div:nth-of-type(1) > div:nth-of-type(2) > div \
     > div:nth-of-type(2) > article > div:nth-of-type(3) > div";

/// Named region locators as configured. Compiled into an [ExtractionSchema].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct RegionLocators {
    pub number: String,
    pub title: String,
    pub content: String,
    /// Matched against descendants of the content node.
    pub paragraph: String,
}

impl Default for RegionLocators {
    fn default() -> Self {
        Self {
            number: format!("{} > div:nth-of-type(1) > h1", ARTICLE_BODY),
            title: format!("{} > div:nth-of-type(1) > div:nth-of-type(1)", ARTICLE_BODY),
            content: format!("{} > div:nth-of-type(4)", ARTICLE_BODY),
            paragraph: "p".to_string(),
        }
    }
}

/// Parse a CSS selector or return a locator error (avoids panics from Selector::parse).
fn parse_selector(name: &'static str, sel: &str) -> Result<Selector, ScraperError> {
    Selector::parse(sel).map_err(|e| ScraperError::InvalidLocator {
        name,
        selector: sel.to_string(),
        reason: e.to_string(),
    })
}

/// Compiled locators.
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    number: Selector,
    title: Selector,
    content: Selector,
    paragraph: Selector,
}

impl ExtractionSchema {
    pub fn new(locators: &RegionLocators) -> Result<Self, ScraperError> {
        Ok(Self {
            number: parse_selector("number", &locators.number)?,
            title: parse_selector("title", &locators.title)?,
            content: parse_selector("content", &locators.content)?,
            paragraph: parse_selector("paragraph", &locators.paragraph)?,
        })
    }

    /// Parse raw page bytes into a record. Invalid UTF-8 is replaced, not rejected.
    pub fn parse(&self, raw: &[u8]) -> Result<ChapterRecord, LayoutError> {
        let html = String::from_utf8_lossy(raw);
        let doc = Html::parse_document(&html);

        let number = first_match(&doc, &self.number, Region::Number)?;
        let title = first_match(&doc, &self.title, Region::Title)?;
        let content = first_match(&doc, &self.content, Region::Content)?;

        let paragraphs = content.select(&self.paragraph).map(element_text);

        // Trimming and blank checks live in ChapterRecord::new.
        ChapterRecord::new(element_text(number), element_text(title), paragraphs).map_err(
            |e| match e {
                RecordError::EmptyNumber => LayoutError::EmptyRegion(Region::Number),
                RecordError::EmptyTitle => LayoutError::EmptyRegion(Region::Title),
                RecordError::NoParagraphs => LayoutError::NoParagraphs,
            },
        )
    }
}

fn first_match<'a>(
    doc: &'a Html,
    selector: &Selector,
    region: Region,
) -> Result<ElementRef<'a>, LayoutError> {
    doc.select(selector)
        .next()
        .ok_or(LayoutError::MissingRegion(region))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}
