use std::{fmt, str::FromStr, time::Duration};

use async_trait::async_trait;
use rand::{Rng, rng};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Placeholder substituted with the request region in the listing URL template.
pub const REGION_PLACEHOLDER: &str = "{region}";

pub const DEFAULT_LISTING_URL: &str = "https://{region}.craigslist.org/search/jjj";

// -------------------------
// Request configuration
// -------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortMode {
    #[default]
    Date,
    Relevance,
}

impl SortMode {
    /// Value of the `sort` query parameter understood by the listing source.
    pub fn as_param(self) -> &'static str {
        match self {
            SortMode::Date => "date",
            SortMode::Relevance => "rel",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sort mode `{0}`")]
pub struct UnknownSortMode(pub String);

impl FromStr for SortMode {
    type Err = UnknownSortMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(SortMode::Date),
            "rel" => Ok(SortMode::Relevance),
            other => Err(UnknownSortMode(other.to_string())),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Immutable description of one listing search. Built per call, never shared mutably.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingRequest {
    pub query: String,
    pub region: String,
    pub sort: SortMode,
}

impl ListingRequest {
    pub fn new(query: impl Into<String>, region: impl Into<String>, sort: SortMode) -> Self {
        Self {
            query: query.into(),
            region: region.into(),
            sort,
        }
    }
}

// -------------------------
// Page source
// -------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("region `{region}` does not form a valid listing url: {source}")]
    InvalidUrl {
        region: String,
        #[source]
        source: url::ParseError,
    },
}

/// Anything that can hand back the raw text of one listing page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the page at `offset` (ads skipped), or the source's first page when `None`.
    async fn fetch(&self, request: &ListingRequest, offset: Option<usize>)
    -> Result<String, FetchError>;
}

/// `PageSource` backed by one shared `reqwest::Client`.
pub struct HttpPageSource {
    client: reqwest::Client,
    url_template: String,
}

impl HttpPageSource {
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(8))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(
        &self,
        request: &ListingRequest,
        offset: Option<usize>,
    ) -> Result<String, FetchError> {
        let page_url = build_page_url(&self.url_template, request, offset)?;

        let rsp = self
            .client
            .get(page_url.as_str())
            .headers(base_headers())
            .send()
            .await
            .map_err(|e| classify(&page_url, e))?;

        let status = rsp.status();
        let text = rsp.text().await.map_err(|e| classify(&page_url, e))?;
        debug!(url = %page_url, ?offset, %status, len = text.len(), "fetched listing page");
        Ok(text)
    }
}

fn classify(page_url: &Url, e: reqwest::Error) -> FetchError {
    let url = page_url.to_string();
    if e.is_timeout() {
        warn!(%url, "listing fetch timed out");
        FetchError::Timeout { url }
    } else {
        warn!(%url, error = %e, "listing fetch failed");
        FetchError::Transport { url, source: e }
    }
}

/// Builds `template` (region substituted) with `query`, `sort` and, when paging, `s=<offset>`.
pub fn build_page_url(
    template: &str,
    request: &ListingRequest,
    offset: Option<usize>,
) -> Result<Url, FetchError> {
    if !is_host_labels(&request.region) {
        return Err(FetchError::InvalidUrl {
            region: request.region.clone(),
            source: url::ParseError::InvalidDomainCharacter,
        });
    }
    let raw = template.replace(REGION_PLACEHOLDER, &request.region);
    let mut u = Url::parse(&raw).map_err(|source| FetchError::InvalidUrl {
        region: request.region.clone(),
        source,
    })?;
    {
        let mut qp = u.query_pairs_mut();
        qp.append_pair("query", &request.query)
            .append_pair("sort", request.sort.as_param());
        if let Some(offset) = offset {
            qp.append_pair("s", &offset.to_string());
        }
    }
    Ok(u)
}

// region lands in the host, so only dot-separated DNS labels are allowed
fn is_host_labels(region: &str) -> bool {
    region.split('.').all(|label| {
        !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

// -------------------------
// Header helpers
// -------------------------

fn base_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(USER_AGENT, HeaderValue::from_static(random_desktop_ua()));
    h.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    h
}

fn random_desktop_ua() -> &'static str {
    const UAS: &[&str] = &[
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    ];
    UAS[rng().random_range(0..UAS.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sort: SortMode) -> ListingRequest {
        ListingRequest::new("rust developer", "seattle", sort)
    }

    #[test]
    fn first_page_url_has_query_and_default_sort() {
        let u = build_page_url(DEFAULT_LISTING_URL, &request(SortMode::default()), None).unwrap();
        assert_eq!(u.host_str(), Some("seattle.craigslist.org"));
        assert_eq!(u.path(), "/search/jjj");
        let pairs: Vec<(String, String)> = u.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("query".to_string(), "rust developer".to_string()),
                ("sort".to_string(), "date".to_string()),
            ]
        );
    }

    #[test]
    fn paged_url_carries_offset() {
        let u = build_page_url(DEFAULT_LISTING_URL, &request(SortMode::Relevance), Some(240))
            .unwrap();
        let pairs: Vec<(String, String)> = u.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("sort".to_string(), "rel".to_string())));
        assert!(pairs.contains(&("s".to_string(), "240".to_string())));
    }

    #[test]
    fn region_that_breaks_the_host_is_rejected() {
        for region in [
            "not a host",
            "",
            "169.254.169.254/latest/meta-data#",
            "localhost:8080/admin?",
            "user@internal",
            "seattle..",
        ] {
            let bad = ListingRequest::new("dogs", region, SortMode::Date);
            let err = build_page_url(DEFAULT_LISTING_URL, &bad, None).unwrap_err();
            assert!(matches!(err, FetchError::InvalidUrl { .. }), "region={region:?}");
        }
    }

    #[test]
    fn dotted_and_hyphenated_regions_are_accepted() {
        for region in ["seattle", "new-york", "sfbay.en"] {
            let req = ListingRequest::new("dogs", region, SortMode::Date);
            let u = build_page_url(DEFAULT_LISTING_URL, &req, None).unwrap();
            assert_eq!(u.host_str(), Some(format!("{region}.craigslist.org").as_str()));
        }
    }

    #[test]
    fn sort_mode_parses_only_known_values() {
        assert_eq!("date".parse::<SortMode>(), Ok(SortMode::Date));
        assert_eq!("rel".parse::<SortMode>(), Ok(SortMode::Relevance));
        assert_eq!(
            "bogus".parse::<SortMode>(),
            Err(UnknownSortMode("bogus".to_string()))
        );
    }
}
