// src/crawler/walker.rs
//! Traversal of numbered result pages

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::core::PageFetcher;
use crate::error::chain;
use crate::extract::{control_present, LinkRule};

/// Detail links found in one step of a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub links: Vec<String>,
    /// `false` once the walk has nothing left to offer.
    pub has_more: bool,
}

impl Batch {
    pub fn new(links: Vec<String>, has_more: bool) -> Self {
        Self { links, has_more }
    }

    pub fn finished() -> Self {
        Self::default()
    }
}

/// Produces detail links batch by batch until the result list is exhausted.
#[async_trait]
pub trait PageWalker: Send {
    async fn next_batch(&mut self) -> Batch;
}

/// Result page URL for a 1-based page index.
pub fn page_url(template: &str, page: u32) -> String {
    if template.contains("{page}") {
        template.replace("{page}", &page.to_string())
    } else {
        format!("{template}{page}")
    }
}

/// Links on a result page and whether an enabled control matching `control`
/// exists on it. Without a control selector the page always counts as having one.
pub(crate) fn scan_result_page(
    body: &str,
    links: &LinkRule,
    base_url: &Url,
    control: Option<&Selector>,
) -> (Vec<String>, bool) {
    let document = Html::parse_document(body);
    let found = links.links_in(&document, base_url);
    let control_found = control.map_or(true, |sel| control_present(&document, sel));
    (found, control_found)
}

/// Walks `search_url` page 1, 2, ... up to `max_pages`.
pub struct NumberedWalker {
    fetcher: Arc<dyn PageFetcher>,
    search_url: String,
    base_url: Url,
    links: LinkRule,
    next_control: Option<Selector>,
    max_pages: u32,
    max_results: Option<usize>,
    next_page: u32,
    yielded: usize,
    finished: bool,
}

impl NumberedWalker {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        search_url: impl Into<String>,
        base_url: Url,
        links: LinkRule,
        max_pages: u32,
    ) -> Self {
        Self {
            fetcher,
            search_url: search_url.into(),
            base_url,
            links,
            next_control: None,
            max_pages,
            max_results: None,
            next_page: 1,
            yielded: 0,
            finished: false,
        }
    }

    /// Stop as soon as a page lacks an enabled "next page" control.
    pub fn with_next_control(mut self, control: Option<Selector>) -> Self {
        self.next_control = control;
        self
    }

    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Pages requested so far.
    pub fn pages_visited(&self) -> u32 {
        self.next_page - 1
    }

    fn finish(&mut self) -> Batch {
        self.finished = true;
        Batch::finished()
    }
}

#[async_trait]
impl PageWalker for NumberedWalker {
    async fn next_batch(&mut self) -> Batch {
        if self.finished || self.next_page > self.max_pages {
            return self.finish();
        }

        let page = self.next_page;
        self.next_page += 1;
        let pages_left = page < self.max_pages;

        let url = page_url(&self.search_url, page);
        info!(page, url = %url, "scanning result page");

        let body = match self.fetcher.fetch(&url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(page, error = %chain(e), "result page failed, moving on");
                self.finished = !pages_left;
                return Batch::new(Vec::new(), pages_left);
            }
        };

        let (mut links, next_available) = scan_result_page(
            &body,
            &self.links,
            &self.base_url,
            self.next_control.as_ref(),
        );
        info!(page, found = links.len(), "links found on result page");

        let mut has_more = pages_left;
        if links.is_empty() {
            info!(page, "no listings on result page, stopping");
            has_more = false;
        } else if !next_available {
            info!(page, "no next page control, stopping");
            has_more = false;
        }

        if let Some(cap) = self.max_results {
            let remaining = cap.saturating_sub(self.yielded);
            if links.len() >= remaining {
                links.truncate(remaining);
                info!(cap, "result cap reached");
                has_more = false;
            }
        }

        self.yielded += links.len();
        self.finished = !has_more;
        Batch::new(links, has_more)
    }
}
