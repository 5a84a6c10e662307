// -------------------------
// Paging + aggregation over a listing source
// -------------------------

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::extract::PageExtractor;
use crate::fetch::{FetchError, ListingRequest, PageSource};
use crate::interval::{Interval, parse_timestamp};

/// Maximum ads per page; the source pages in steps of this many ads.
pub const PAGE_SIZE: usize = 120;

/// Drives a `PageSource` + `PageExtractor` pair. Pages are fetched strictly in order,
/// and any fetch failure aborts the call without partial results.
#[derive(Clone)]
pub struct Listings {
    source: Arc<dyn PageSource>,
    extractor: Arc<dyn PageExtractor>,
}

impl Listings {
    pub fn new(source: Arc<dyn PageSource>, extractor: Arc<dyn PageExtractor>) -> Self {
        Self { source, extractor }
    }

    /// Raw timestamps of every ad within `interval`, across all pages, in source order.
    pub async fn timestamps_within(
        &self,
        request: &ListingRequest,
        interval: &Interval,
    ) -> Result<Vec<String>, FetchError> {
        let first = self.source.fetch(request, None).await?;
        let Some(total) = self.extractor.total_count(&first) else {
            debug!(query = %request.query, region = %request.region, "no total count on first page");
            return Ok(Vec::new());
        };

        // offset 0 is the page already in hand
        let mut cached = Some(first);
        let mut kept = Vec::new();
        let mut pages = 0usize;
        for offset in (0..total).step_by(PAGE_SIZE) {
            let page = match cached.take() {
                Some(page) => page,
                None => self.source.fetch(request, Some(offset)).await?,
            };
            pages += 1;
            kept.extend(self.filter_page(&page, interval));
        }

        info!(
            query = %request.query,
            region = %request.region,
            total,
            pages,
            kept = kept.len(),
            "interval scan finished"
        );
        Ok(kept)
    }

    /// First `amount` ad URLs of the source's first page. Never pages further.
    pub async fn top_urls(
        &self,
        request: &ListingRequest,
        amount: usize,
    ) -> Result<Vec<String>, FetchError> {
        let page = self.source.fetch(request, None).await?;
        let mut urls = self.extractor.urls(&page);
        urls.truncate(amount);
        info!(
            query = %request.query,
            region = %request.region,
            sort = %request.sort,
            returned = urls.len(),
            "top scan finished"
        );
        Ok(urls)
    }

    fn filter_page(&self, page: &str, interval: &Interval) -> Vec<String> {
        self.extractor
            .timestamps(page, false)
            .into_iter()
            .filter(|raw| match parse_timestamp(raw) {
                Ok(t) => interval.contains(t),
                Err(e) => {
                    warn!(error = %e, "skipping ad with unreadable timestamp");
                    false
                }
            })
            .collect()
    }
}
