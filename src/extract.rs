//! Field extraction from listing pages.
//!
//! Extraction never fails on a fetched page: missing or malformed markup
//! degrades to `None` / an empty list.

use anyhow::{Result, anyhow};
use scraper::{Html, Selector};

const TOTAL_COUNT_CSS: &str = "span.totalcount";
const TIMESTAMP_CSS: &str = "time.result-date";
// matches both classes in any order, not only the adjacent `result-title hdrlnk` sequence
const AD_LINK_CSS: &str = "a.result-title.hdrlnk";

/// The three read-only projections of one listing page.
pub trait PageExtractor: Send + Sync {
    /// Total number of results the source reports, `None` when the field is absent.
    fn total_count(&self, page: &str) -> Option<usize>;

    /// Raw ad timestamp strings in document order; at most one when `first_only`.
    fn timestamps(&self, page: &str, first_only: bool) -> Vec<String>;

    /// Ad detail URLs in document order.
    fn urls(&self, page: &str) -> Vec<String>;
}

/// `PageExtractor` for the classic listing markup, using CSS selectors.
pub struct HtmlExtractor {
    total_count: Selector,
    timestamp: Selector,
    ad_link: Selector,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            total_count: compile(TOTAL_COUNT_CSS)?,
            timestamp: compile(TIMESTAMP_CSS)?,
            ad_link: compile(AD_LINK_CSS)?,
        })
    }
}

fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector `{css}`: {e}"))
}

impl PageExtractor for HtmlExtractor {
    fn total_count(&self, page: &str) -> Option<usize> {
        let doc = Html::parse_document(page);
        let raw = doc
            .select(&self.total_count)
            .next()
            .map(|e| e.text().collect::<String>())?;
        parse_count(&raw)
    }

    fn timestamps(&self, page: &str, first_only: bool) -> Vec<String> {
        let doc = Html::parse_document(page);
        let found = doc
            .select(&self.timestamp)
            .filter_map(|e| e.value().attr("datetime"))
            .map(str::to_string);
        if first_only {
            found.take(1).collect()
        } else {
            found.collect()
        }
    }

    fn urls(&self, page: &str) -> Vec<String> {
        let doc = Html::parse_document(page);
        doc.select(&self.ad_link)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect()
    }
}

// "1,234" is rendered on big result sets
fn parse_count(raw: &str) -> Option<usize> {
    let digits: String = raw.trim().chars().filter(|c| *c != ',').collect();
    digits.parse::<usize>().ok()
}
