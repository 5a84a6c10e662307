// Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use adwatch::Listings;
use adwatch::extract::HtmlExtractor;
use adwatch::fetch::{FetchError, ListingRequest, PageSource};

pub const PAGE_ONE: &str = include_str!("../fixtures/page_one.html");
pub const PAGE_TWO: &str = include_str!("../fixtures/page_two.html");
pub const THREE_ADS: &str = include_str!("../fixtures/three_ads.html");
pub const EMPTY: &str = include_str!("../fixtures/empty.html");

/// In-process `PageSource` serving canned pages by offset and recording every call.
#[derive(Default)]
pub struct ScriptedSource {
    pages: HashMap<Option<usize>, String>,
    timeout_at: Option<Option<usize>>,
    calls: Mutex<Vec<(ListingRequest, Option<usize>)>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, offset: Option<usize>, body: &str) -> Self {
        self.pages.insert(offset, body.to_string());
        self
    }

    /// Makes the fetch at `offset` time out.
    pub fn timeout_at(mut self, offset: Option<usize>) -> Self {
        self.timeout_at = Some(offset);
        self
    }

    pub fn offsets(&self) -> Vec<Option<usize>> {
        self.calls.lock().unwrap().iter().map(|(_, o)| *o).collect()
    }

    pub fn requests(&self) -> Vec<ListingRequest> {
        self.calls.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch(
        &self,
        request: &ListingRequest,
        offset: Option<usize>,
    ) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push((request.clone(), offset));
        if self.timeout_at == Some(offset) {
            return Err(FetchError::Timeout {
                url: format!("scripted://{}?s={:?}", request.region, offset),
            });
        }
        // unknown offsets behave like a page past the end
        Ok(self.pages.get(&offset).cloned().unwrap_or_default())
    }
}

pub fn listings(source: Arc<ScriptedSource>) -> Listings {
    Listings::new(source, Arc::new(HtmlExtractor::new().unwrap()))
}
