// src/crawler/mod.rs
//! Pagination walkers and the crawl controller

pub mod controller;
pub mod load_more;
pub mod retry;
pub mod walker;

pub use controller::{CrawlController, CrawlPhase, CrawlReport, CrawlState};
pub use load_more::{HttpLoadMore, IncrementalWalker, LoadMoreControl, LoadOutcome};
pub use retry::RetryPolicy;
pub use walker::{page_url, Batch, NumberedWalker, PageWalker};

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::CrawlSettings;
use crate::core::{ListingStore, PageFetcher};
use crate::extract::WalkMode;

/// The walker matching the configured walk mode.
pub fn build_walker(
    settings: &CrawlSettings,
    fetcher: Arc<dyn PageFetcher>,
) -> Result<Box<dyn PageWalker>> {
    match settings.walk {
        WalkMode::Numbered => Ok(Box::new(
            NumberedWalker::new(
                fetcher,
                settings.search_url.clone(),
                settings.base_url.clone(),
                settings.links.clone(),
                settings.max_pages,
            )
            .with_next_control(settings.next_control.clone())
            .with_max_results(settings.max_results),
        )),
        WalkMode::LoadMore => {
            let control = settings
                .load_more_control
                .clone()
                .context("load more walk without a control selector")?;
            let list = HttpLoadMore::new(
                fetcher,
                settings.search_url.clone(),
                settings.base_url.clone(),
                settings.links.clone(),
                control,
                settings.max_pages,
            );
            Ok(Box::new(
                IncrementalWalker::new(list, settings.retry)
                    .with_batch_size(settings.batch_size)
                    .with_max_results(settings.max_results),
            ))
        }
    }
}

impl<'a> CrawlController<'a> {
    pub fn from_settings(
        fetcher: &'a dyn PageFetcher,
        store: &'a dyn ListingStore,
        settings: &'a CrawlSettings,
    ) -> Self {
        CrawlController::new(fetcher, store, &settings.rules)
            .with_keywords(settings.exclude_keywords.clone())
            .with_date_format(settings.date_format.clone())
            .with_request_delay(settings.request_delay)
    }
}

/// Walk and process everything the configured source offers.
pub async fn crawl(
    settings: &CrawlSettings,
    fetcher: Arc<dyn PageFetcher>,
    store: &dyn ListingStore,
) -> Result<CrawlState> {
    let mut walker = build_walker(settings, fetcher.clone())?;
    let controller = CrawlController::from_settings(fetcher.as_ref(), store, settings);

    let state = controller.run(walker.as_mut(), CrawlState::new()).await?;
    Ok(state)
}
