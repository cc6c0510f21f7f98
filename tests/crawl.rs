mod common;

use common::{ad_page, result_page, MockFetcher};
use jobscout::config::CrawlerConfig;
use jobscout::core::CollectingStore;
use jobscout::crawler::{build_walker, crawl, CrawlController, CrawlPhase, CrawlState};
use jobscout::SourceKind;
use std::sync::Arc;

const PAGE_1: &str = "https://www.kleinanzeigen.de/s-jobs/seite:1/c102";
const PAGE_2: &str = "https://www.kleinanzeigen.de/s-jobs/seite:2/c102";
const PAGE_3: &str = "https://www.kleinanzeigen.de/s-jobs/seite:3/c102";

fn ad_url(id: u32) -> String {
    format!("https://www.kleinanzeigen.de/s-anzeige/job-{id}/{id}")
}

fn ad_path(id: u32) -> String {
    format!("/s-anzeige/job-{id}/{id}")
}

fn kleinanzeigen(max_pages: u32) -> CrawlerConfig {
    let mut config = CrawlerConfig::for_source(SourceKind::Kleinanzeigen);
    config.max_pages = Some(max_pages);
    config
}

#[tokio::test]
async fn failing_second_page_still_finishes() {
    let (a, b, c) = (ad_path(1), ad_path(2), ad_path(3));
    let fetcher = MockFetcher::new()
        .page(PAGE_1, result_page(&[a.as_str(), b.as_str(), c.as_str()]))
        .failing(PAGE_2)
        .page(&ad_url(1), ad_page("Koch (m/w/d)", "Wir suchen Verstärkung", "30.08.2024", Some("15 €")))
        .page(&ad_url(2), ad_page("Fahrer", "Fahrer für Kurierdienst", "29.08.2024", None))
        .page(&ad_url(3), ad_page("Reinigungskraft", "Minijob im Büro", "28.08.2024", None));
    let fetcher = Arc::new(fetcher);
    let settings = kleinanzeigen(2).compile().unwrap();
    let store = CollectingStore::new();

    let state = crawl(&settings, fetcher.clone(), &store).await.unwrap();

    assert_eq!(state.phase, CrawlPhase::Done);
    assert_eq!(fetcher.requests_matching("/s-anzeige/"), 3);
    assert_eq!(fetcher.requests_matching("/s-jobs/"), 2);
    assert_eq!(state.report.persisted, 3);

    let collected = store.into_candidates();
    assert_eq!(collected[0].title, "Koch (m/w/d)");
    assert_eq!(collected[0].salary.as_deref(), Some("15 €"));
    assert_eq!(collected[0].location, "10115 Berlin - Mitte");
    assert_eq!(
        collected[0].posted_at.map(|d| d.to_rfc3339()),
        Some("2024-08-30T00:00:00+00:00".to_string())
    );
}

#[tokio::test]
async fn link_seen_twice_is_fetched_once() {
    let (a, b) = (ad_path(1), ad_path(2));
    let fetcher = Arc::new(
        MockFetcher::new()
            .page(PAGE_1, result_page(&[a.as_str(), b.as_str()]))
            .page(PAGE_2, result_page(&[b.as_str(), a.as_str()]))
            .page(PAGE_3, result_page(&[]))
            .page(&ad_url(1), ad_page("Koch", "Wir suchen", "01.09.2024", None))
            .page(&ad_url(2), ad_page("Kellner", "Wir suchen", "01.09.2024", None)),
    );
    let settings = kleinanzeigen(3).compile().unwrap();
    let store = CollectingStore::new();

    let state = crawl(&settings, fetcher.clone(), &store).await.unwrap();

    assert_eq!(fetcher.requests_matching(&ad_path(1)), 1);
    assert_eq!(fetcher.requests_matching(&ad_path(2)), 1);
    assert_eq!(state.report.duplicate_links, 2);
    assert_eq!(state.visited.len(), 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn job_seeker_ads_are_not_stored() {
    let (a, b) = (ad_path(1), ad_path(2));
    let fetcher = Arc::new(
        MockFetcher::new()
            .page(PAGE_1, result_page(&[a.as_str(), b.as_str()]))
            .page(
                &ad_url(1),
                ad_page("Suche Arbeit", "ICH SUCHE ARBEIT als Lagerhelfer", "02.09.2024", None),
            )
            .page(&ad_url(2), ad_page("Lagerhelfer", "Wir stellen ein", "02.09.2024", None)),
    );
    let settings = kleinanzeigen(1).compile().unwrap();
    let store = CollectingStore::new();

    let state = crawl(&settings, fetcher, &store).await.unwrap();

    assert_eq!(state.report.job_seeker_ads, 1);
    let titles: Vec<_> = store.into_candidates().into_iter().map(|c| c.title).collect();
    assert_eq!(titles, vec!["Lagerhelfer"]);
}

#[tokio::test]
async fn run_id_and_state_are_handed_back() {
    let fetcher = Arc::new(MockFetcher::new().page(PAGE_1, result_page(&[])));
    let settings = kleinanzeigen(3).compile().unwrap();
    let store = CollectingStore::new();
    let initial = CrawlState::new();
    let run_id = initial.run_id;

    let mut walker = build_walker(&settings, fetcher.clone()).unwrap();
    let controller = CrawlController::from_settings(fetcher.as_ref(), &store, &settings);
    let state = controller.run(walker.as_mut(), initial).await.unwrap();

    assert_eq!(state.run_id, run_id);
    assert!(state.is_done());
    assert_eq!(state.report.batches, 1);
    assert_eq!(state.report.links_seen, 0);
    assert_eq!(fetcher.requests(), vec![PAGE_1.to_string()]);
}
