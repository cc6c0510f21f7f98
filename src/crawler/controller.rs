// src/crawler/controller.rs
//! One incremental crawl: watermark, walk, detail fetch, classify, persist

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::walker::PageWalker;
use crate::classifier::ExcludeKeywords;
use crate::core::{ListingStore, PageFetcher};
use crate::dates::DateFormat;
use crate::error::{chain, CrawlError};
use crate::extract::{build_candidate, DetailRules};
use crate::types::{ListingCandidate, Watermark};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    #[default]
    Idle,
    ComputingWatermark,
    Walking,
    FetchingDetail,
    Classifying,
    Persisting,
    Done,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrawlPhase::Idle => "idle",
            CrawlPhase::ComputingWatermark => "computing_watermark",
            CrawlPhase::Walking => "walking",
            CrawlPhase::FetchingDetail => "fetching_detail",
            CrawlPhase::Classifying => "classifying",
            CrawlPhase::Persisting => "persisting",
            CrawlPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Counters of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub batches: usize,
    pub links_seen: usize,
    pub duplicate_links: usize,
    pub detail_fetches: usize,
    pub fetch_failures: usize,
    pub incomplete: usize,
    pub already_processed: usize,
    pub job_seeker_ads: usize,
    pub persisted: usize,
    pub persist_failures: usize,
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} links ({} duplicate), {} stored, {} already processed, {} job-seeker ads, \
             {} incomplete, {} fetch failures, {} store failures",
            self.links_seen,
            self.duplicate_links,
            self.persisted,
            self.already_processed,
            self.job_seeker_ads,
            self.incomplete,
            self.fetch_failures,
            self.persist_failures,
        )
    }
}

/// Everything a run carries from link to link. Passed in and handed back by
/// [`CrawlController::run`].
#[derive(Debug, Clone)]
pub struct CrawlState {
    pub run_id: Uuid,
    pub phase: CrawlPhase,
    pub watermark: Option<Watermark>,
    pub visited: HashSet<String>,
    pub report: CrawlReport,
}

impl CrawlState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            phase: CrawlPhase::Idle,
            watermark: None,
            visited: HashSet::new(),
            report: CrawlReport::default(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == CrawlPhase::Done
    }

    fn enter(&mut self, phase: CrawlPhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "phase change");
            self.phase = phase;
        }
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}

enum LinkOutcome {
    Stored { id: i64, title: String },
    AlreadyProcessed,
    JobSeeker { keyword: String },
}

pub struct CrawlController<'a> {
    fetcher: &'a dyn PageFetcher,
    store: &'a dyn ListingStore,
    rules: &'a DetailRules,
    keywords: ExcludeKeywords,
    date_format: DateFormat,
    request_delay: Duration,
}

impl<'a> CrawlController<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        store: &'a dyn ListingStore,
        rules: &'a DetailRules,
    ) -> Self {
        Self {
            fetcher,
            store,
            rules,
            keywords: ExcludeKeywords::default(),
            date_format: DateFormat::default(),
            request_delay: Duration::ZERO,
        }
    }

    pub fn with_keywords(mut self, keywords: ExcludeKeywords) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_date_format(mut self, date_format: DateFormat) -> Self {
        self.date_format = date_format;
        self
    }

    /// Pause between consecutive detail fetches.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Run a crawl to completion.
    ///
    /// The watermark is read once up front; failing to read it is the only
    /// error returned. Everything after that is logged, counted and skipped.
    pub async fn run<W>(&self, walker: &mut W, state: CrawlState) -> Result<CrawlState, CrawlError>
    where
        W: PageWalker + ?Sized,
    {
        let span = info_span!("crawl", run_id = %state.run_id);
        self.run_inner(walker, state).instrument(span).await
    }

    async fn run_inner<W>(&self, walker: &mut W, mut state: CrawlState) -> Result<CrawlState, CrawlError>
    where
        W: PageWalker + ?Sized,
    {
        state.enter(CrawlPhase::ComputingWatermark);
        let latest = self.store.latest_posted_at().await.map_err(|e| {
            error!(error = %format!("{e:#}"), "cannot read last processed date");
            CrawlError::WatermarkUnavailable(e)
        })?;
        let watermark = Watermark::from_latest(latest);
        state.watermark = Some(watermark);
        info!(watermark = %watermark.last_processed, "crawl started");

        loop {
            state.enter(CrawlPhase::Walking);
            let batch = walker.next_batch().await;
            state.report.batches += 1;

            for link in batch.links {
                state.report.links_seen += 1;
                if !state.visited.insert(link.clone()) {
                    debug!(url = %link, "link already visited in this run");
                    state.report.duplicate_links += 1;
                    continue;
                }
                self.process_link(&link, &watermark, &mut state).await;
            }

            if !batch.has_more {
                break;
            }
        }

        state.enter(CrawlPhase::Done);
        info!(summary = %state.report, "crawl finished");
        Ok(state)
    }

    async fn process_link(&self, url: &str, watermark: &Watermark, state: &mut CrawlState) {
        match self.handle_link(url, watermark, state).await {
            Ok(LinkOutcome::Stored { id, title }) => {
                info!(url, id, title = %title, "listing stored");
                state.report.persisted += 1;
            }
            Ok(LinkOutcome::AlreadyProcessed) => {
                info!(url, "already processed");
                state.report.already_processed += 1;
            }
            Ok(LinkOutcome::JobSeeker { keyword }) => {
                info!(url, keyword = %keyword, "skipped job-seeker ad");
                state.report.job_seeker_ads += 1;
            }
            Err(e @ CrawlError::Transport(_)) => {
                warn!(url, error = %chain(e), "detail page failed");
                state.report.fetch_failures += 1;
            }
            Err(e @ CrawlError::Parse { .. }) => {
                warn!(url, error = %chain(e), "detail page incomplete");
                state.report.incomplete += 1;
            }
            Err(e) => {
                error!(url, error = %chain(e), "listing not stored");
                state.report.persist_failures += 1;
            }
        }
    }

    async fn handle_link(
        &self,
        url: &str,
        watermark: &Watermark,
        state: &mut CrawlState,
    ) -> Result<LinkOutcome, CrawlError> {
        state.enter(CrawlPhase::FetchingDetail);
        if state.report.detail_fetches > 0 && !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        state.report.detail_fetches += 1;
        let body = self.fetcher.fetch(url).await?;

        let candidate = self.extract(url, &body)?;

        state.enter(CrawlPhase::Classifying);
        if candidate.is_processed(watermark) {
            return Ok(LinkOutcome::AlreadyProcessed);
        }
        if let Some(keyword) = self.keywords.first_match(&candidate.description) {
            return Ok(LinkOutcome::JobSeeker {
                keyword: keyword.to_string(),
            });
        }

        state.enter(CrawlPhase::Persisting);
        let stored = self
            .store
            .insert(candidate)
            .await
            .map_err(|source| CrawlError::Persistence {
                url: url.to_string(),
                source,
            })?;

        Ok(LinkOutcome::Stored {
            id: stored.id,
            title: stored.title,
        })
    }

    fn extract(&self, url: &str, body: &str) -> Result<ListingCandidate, CrawlError> {
        let fields = self.rules.extract(body);
        build_candidate(url, &fields, &self.date_format).ok_or_else(|| CrawlError::Parse {
            url: url.to_string(),
            what: "title",
            reason: "no title on detail page".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CollectingStore;
    use crate::crawler::walker::Batch;
    use crate::error::FetchError;
    use crate::extract::{Field, RuleSpec};
    use crate::types::StoredListing;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::{BTreeMap, HashMap, VecDeque};

    struct ScriptedWalker(VecDeque<Batch>);

    impl ScriptedWalker {
        fn new(batches: Vec<(Vec<&str>, bool)>) -> Self {
            Self(
                batches
                    .into_iter()
                    .map(|(links, more)| {
                        Batch::new(links.into_iter().map(String::from).collect(), more)
                    })
                    .collect(),
            )
        }
    }

    #[async_trait]
    impl PageWalker for ScriptedWalker {
        async fn next_batch(&mut self) -> Batch {
            self.0.pop_front().unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct Pages(HashMap<String, String>);

    impl Pages {
        fn detail(mut self, url: &str, title: &str, description: &str, date: &str) -> Self {
            self.0.insert(
                url.to_string(),
                format!(
                    r#"<html><body><h1>{title}</h1><p class="desc">{description}</p>
                       <span class="date">{date}</span></body></html>"#
                ),
            );
            self
        }
    }

    #[async_trait]
    impl PageFetcher for Pages {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.0.get(url).cloned().ok_or(FetchError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            })
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ListingStore for BrokenStore {
        async fn find_most_recent(&self) -> anyhow::Result<Option<StoredListing>> {
            Err(anyhow!("database is locked"))
        }

        async fn insert(&self, _candidate: ListingCandidate) -> anyhow::Result<StoredListing> {
            Err(anyhow!("database is locked"))
        }
    }

    fn rules() -> DetailRules {
        DetailRules::compile(&BTreeMap::from([
            (Field::Title, RuleSpec::text("h1")),
            (Field::Description, RuleSpec::text("p.desc")),
            (Field::PostedAt, RuleSpec::text("span.date")),
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn classifies_and_counts_every_link() {
        let pages = Pages::default()
            .detail("https://b.test/1", "Koch (m/w/d)", "Wir suchen einen Koch", "03.08.2024")
            .detail("https://b.test/2", "Suche Job", "Ich suche Arbeit als Fahrer", "03.08.2024")
            .detail("https://b.test/3", "", "kein Titel", "03.08.2024");
        let store = CollectingStore::new();
        let rules = rules();
        let controller = CrawlController::new(&pages, &store, &rules);
        let mut walker = ScriptedWalker::new(vec![
            (vec!["https://b.test/1", "https://b.test/2"], true),
            (vec!["https://b.test/1", "https://b.test/3", "https://b.test/404"], false),
        ]);

        let state = controller.run(&mut walker, CrawlState::new()).await.unwrap();

        assert!(state.is_done());
        assert_eq!(state.watermark, Some(Watermark::origin()));
        let report = &state.report;
        assert_eq!(report.batches, 2);
        assert_eq!(report.links_seen, 5);
        assert_eq!(report.duplicate_links, 1);
        assert_eq!(report.detail_fetches, 4);
        assert_eq!(report.persisted, 1);
        assert_eq!(report.job_seeker_ads, 1);
        assert_eq!(report.incomplete, 1);
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unreadable_watermark_aborts_before_walking() {
        let pages = Pages::default();
        let rules = rules();
        let controller = CrawlController::new(&pages, &BrokenStore, &rules);
        let mut walker = ScriptedWalker::new(vec![(vec!["https://b.test/1"], false)]);

        let err = controller.run(&mut walker, CrawlState::new()).await.unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(walker.0.len(), 1);
    }

    #[tokio::test]
    async fn store_failures_are_counted_not_fatal() {
        struct WriteOnlyBroken;

        #[async_trait]
        impl ListingStore for WriteOnlyBroken {
            async fn find_most_recent(&self) -> anyhow::Result<Option<StoredListing>> {
                Ok(None)
            }

            async fn insert(&self, _c: ListingCandidate) -> anyhow::Result<StoredListing> {
                Err(anyhow!("disk full"))
            }
        }

        let pages = Pages::default()
            .detail("https://b.test/1", "Koch", "Wir suchen", "03.08.2024")
            .detail("https://b.test/2", "Kellner", "Wir suchen", "04.08.2024");
        let rules = rules();
        let controller = CrawlController::new(&pages, &WriteOnlyBroken, &rules);
        let mut walker =
            ScriptedWalker::new(vec![(vec!["https://b.test/1", "https://b.test/2"], false)]);

        let state = controller.run(&mut walker, CrawlState::new()).await.unwrap();

        assert_eq!(state.report.persist_failures, 2);
        assert_eq!(state.report.persisted, 0);
    }
}
