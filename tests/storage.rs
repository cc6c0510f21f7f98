mod common;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use common::{ad_page, result_page, MockFetcher};
use jobscout::config::CrawlerConfig;
use jobscout::core::{Database, ListingStore};
use jobscout::crawler::crawl;
use jobscout::{ListingCandidate, SourceKind, StoredListing};
use std::sync::Arc;

const PAGE_1: &str = "https://www.kleinanzeigen.de/s-jobs/seite:1/c102";

fn ad_url(id: u32) -> String {
    format!("https://www.kleinanzeigen.de/s-anzeige/job-{id}/{id}")
}

fn settings() -> jobscout::CrawlSettings {
    let mut config = CrawlerConfig::for_source(SourceKind::Kleinanzeigen);
    config.max_pages = Some(1);
    config.compile().unwrap()
}

fn fixture() -> Arc<MockFetcher> {
    let links: Vec<String> = (1..=4)
        .map(|id| format!("/s-anzeige/job-{id}/{id}"))
        .collect();
    let links: Vec<&str> = links.iter().map(String::as_str).collect();

    Arc::new(
        MockFetcher::new()
            .page(PAGE_1, result_page(&links))
            .page(&ad_url(1), ad_page("Alt", "Wir suchen", "30.07.2024", None))
            .page(&ad_url(2), ad_page("Neu", "Wir suchen", "02.08.2024", None))
            .page(&ad_url(3), ad_page("Ohne Datum", "Wir suchen", "", None))
            .page(&ad_url(4), ad_page("Auch neu", "Wir suchen", "05.08.2024", None)),
    )
}

async fn seeded_database(dir: &tempfile::TempDir) -> Database {
    let db = Database::new(&dir.path().join("data").join("jobs.db")).await.unwrap();
    db.insert(
        ListingCandidate::new("Bestand", "https://www.kleinanzeigen.de/s-anzeige/alt/0")
            .with_posted_at(Some(Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap())),
    )
    .await
    .unwrap();
    db
}

#[tokio::test]
async fn watermark_filters_older_listings() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(&dir).await;

    let state = crawl(&settings(), fixture(), &db).await.unwrap();

    assert_eq!(
        state.watermark.map(|w| w.last_processed),
        Some(Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(state.report.already_processed, 1);
    assert_eq!(state.report.persisted, 3);

    let repo = db.listings();
    assert!(repo.find_by_url(&ad_url(1)).await.unwrap().is_none());
    assert!(repo.find_by_url(&ad_url(2)).await.unwrap().is_some());
    let undated = repo.find_by_url(&ad_url(3)).await.unwrap().unwrap();
    assert_eq!(undated.posted_at, None);
    assert_eq!(repo.count().await.unwrap(), 4);
}

#[tokio::test]
async fn second_run_skips_what_the_first_stored() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(&dir).await;

    crawl(&settings(), fixture(), &db).await.unwrap();
    let second = crawl(&settings(), fixture(), &db).await.unwrap();

    // dated listings are behind the new watermark, the undated one hits the unique url
    assert_eq!(second.report.already_processed, 3);
    assert_eq!(second.report.persisted, 0);
    assert_eq!(second.report.persist_failures, 1);
    assert_eq!(db.listings().count().await.unwrap(), 4);
}

#[tokio::test]
async fn database_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.db");

    let db = Database::new(&path).await.unwrap();
    crawl(&settings(), fixture(), &db).await.unwrap();
    db.close().await;

    let reopened = Database::new(&path).await.unwrap();
    let latest = reopened.latest_posted_at().await.unwrap();
    assert_eq!(latest, Some(Utc.with_ymd_and_hms(2024, 8, 5, 0, 0, 0).unwrap()));
}

struct UnavailableStore;

#[async_trait]
impl ListingStore for UnavailableStore {
    async fn find_most_recent(&self) -> anyhow::Result<Option<StoredListing>> {
        Err(anyhow::anyhow!("unable to open database file"))
    }

    async fn insert(&self, _candidate: ListingCandidate) -> anyhow::Result<StoredListing> {
        Err(anyhow::anyhow!("unable to open database file"))
    }
}

#[tokio::test]
async fn unavailable_store_aborts_without_fetching() {
    let fetcher = fixture();

    let err = crawl(&settings(), fetcher.clone(), &UnavailableStore)
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("last processed listing date"));
    assert!(fetcher.requests().is_empty());
}
