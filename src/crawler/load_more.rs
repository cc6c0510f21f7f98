// src/crawler/load_more.rs
//! Result lists that grow in place behind a "load more" control

use async_trait::async_trait;
use scraper::Selector;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::retry::RetryPolicy;
use super::walker::{page_url, scan_result_page, Batch, PageWalker};
use crate::core::PageFetcher;
use crate::error::{chain, FetchError};
use crate::extract::LinkRule;

pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Result of triggering the control once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The awaited item is now in the list.
    Loaded,
    /// Triggered, but the awaited item did not show up.
    Pending,
    /// No enabled control on the page.
    ControlMissing,
}

/// An incrementally growing result list.
#[async_trait]
pub trait LoadMoreControl: Send + Sync {
    /// Links of the loaded items `start..start + count`, fewer if the list is shorter.
    async fn collect(&self, start: usize, count: usize) -> Result<Vec<String>, FetchError>;

    /// Trigger the control and report whether the item at `next_index` exists afterwards.
    async fn load_more(&self, next_index: usize) -> Result<LoadOutcome, FetchError>;
}

#[derive(Debug, Default)]
struct LoadState {
    items: Vec<String>,
    pages_loaded: u32,
    control_present: bool,
}

/// "Load more" over plain HTTP: each trigger fetches the next result page
/// and appends its items to the list.
pub struct HttpLoadMore {
    fetcher: Arc<dyn PageFetcher>,
    search_url: String,
    base_url: Url,
    items: LinkRule,
    control: Selector,
    max_pages: u32,
    state: Mutex<LoadState>,
}

impl HttpLoadMore {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        search_url: impl Into<String>,
        base_url: Url,
        items: LinkRule,
        control: Selector,
        max_pages: u32,
    ) -> Self {
        Self {
            fetcher,
            search_url: search_url.into(),
            base_url,
            items,
            control,
            max_pages,
            state: Mutex::new(LoadState::default()),
        }
    }

    async fn load_page(&self, state: &mut LoadState, page: u32) -> Result<(), FetchError> {
        let url = page_url(&self.search_url, page);
        info!(page, url = %url, "loading result list");

        let body = self.fetcher.fetch(&url).await?;
        let (links, control_found) =
            scan_result_page(&body, &self.items, &self.base_url, Some(&self.control));

        debug!(page, added = links.len(), control_found, "result list extended");
        state.items.extend(links);
        state.pages_loaded = page;
        state.control_present = control_found && page < self.max_pages;
        Ok(())
    }

    async fn ensure_started(&self, state: &mut LoadState) -> Result<(), FetchError> {
        if state.pages_loaded == 0 {
            self.load_page(state, 1).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LoadMoreControl for HttpLoadMore {
    async fn collect(&self, start: usize, count: usize) -> Result<Vec<String>, FetchError> {
        let mut state = self.state.lock().await;
        self.ensure_started(&mut state).await?;

        Ok(state.items.iter().skip(start).take(count).cloned().collect())
    }

    async fn load_more(&self, next_index: usize) -> Result<LoadOutcome, FetchError> {
        let mut state = self.state.lock().await;
        self.ensure_started(&mut state).await?;

        if state.items.len() > next_index {
            return Ok(LoadOutcome::Loaded);
        }
        if !state.control_present {
            return Ok(LoadOutcome::ControlMissing);
        }

        let next_page = state.pages_loaded + 1;
        self.load_page(&mut state, next_page).await?;

        if state.items.len() > next_index {
            Ok(LoadOutcome::Loaded)
        } else {
            Ok(LoadOutcome::Pending)
        }
    }
}

/// Walks a [`LoadMoreControl`] in fixed-size batches. The control is retried
/// under `retry` before each batch after the first; when it stays
/// unavailable the walk ends.
pub struct IncrementalWalker<C> {
    control: C,
    retry: RetryPolicy,
    batch_size: usize,
    max_results: Option<usize>,
    cursor: usize,
    started: bool,
    finished: bool,
}

impl<C: LoadMoreControl> IncrementalWalker<C> {
    pub fn new(control: C, retry: RetryPolicy) -> Self {
        Self {
            control,
            retry,
            batch_size: DEFAULT_BATCH_SIZE,
            max_results: None,
            cursor: 0,
            started: false,
            finished: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Items handed out so far.
    pub fn collected(&self) -> usize {
        self.cursor
    }

    async fn trigger_control(&self) -> bool {
        let control = &self.control;
        let next_index = self.cursor;

        self.retry
            .run("load more", |attempt| async move {
                match control.load_more(next_index).await {
                    Ok(LoadOutcome::Loaded) => Ok(Some(())),
                    Ok(LoadOutcome::Pending) => {
                        debug!(attempt, next_index, "new items not loaded yet");
                        Ok(None)
                    }
                    Ok(LoadOutcome::ControlMissing) => {
                        debug!(attempt, "load more control not available");
                        Ok(None)
                    }
                    Err(e) => Err(anyhow::Error::from(e)),
                }
            })
            .await
            .is_some()
    }
}

#[async_trait]
impl<C: LoadMoreControl> PageWalker for IncrementalWalker<C> {
    async fn next_batch(&mut self) -> Batch {
        if self.finished {
            return Batch::finished();
        }

        if self.started && !self.trigger_control().await {
            info!(collected = self.cursor, "no more results to load");
            self.finished = true;
            return Batch::finished();
        }
        self.started = true;

        let mut links = match self.control.collect(self.cursor, self.batch_size).await {
            Ok(links) => links,
            Err(e) => {
                warn!(error = %chain(e), "reading loaded results failed");
                Vec::new()
            }
        };
        info!(start = self.cursor, found = links.len(), "links collected");

        let mut has_more = true;
        if let Some(cap) = self.max_results {
            let remaining = cap.saturating_sub(self.cursor);
            if links.len() >= remaining {
                links.truncate(remaining);
                info!(cap, "result cap reached");
                has_more = false;
            }
        }

        self.cursor += links.len();
        self.finished = !has_more;
        Batch::new(links, has_more)
    }
}
