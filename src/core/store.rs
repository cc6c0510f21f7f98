// src/core/store.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

use crate::types::{ListingCandidate, StoredListing};

/// Where accepted listings end up.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Stored listing with the latest date, if any.
    async fn find_most_recent(&self) -> Result<Option<StoredListing>>;

    async fn latest_posted_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.find_most_recent().await?.and_then(|l| l.posted_at))
    }

    async fn insert(&self, candidate: ListingCandidate) -> Result<StoredListing>;
}

/// In-memory store for collect-only runs.
#[derive(Default)]
pub struct CollectingStore {
    listings: Mutex<Vec<StoredListing>>,
}

impl CollectingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Collected candidates in insertion order.
    pub fn into_candidates(self) -> Vec<ListingCandidate> {
        self.listings
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into_iter()
            .map(|l| ListingCandidate {
                title: l.title,
                description: l.description,
                location: l.location,
                posted_at: l.posted_at,
                salary: l.salary,
                source_url: l.source_url,
                details: l.details,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredListing>> {
        self.listings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ListingStore for CollectingStore {
    async fn find_most_recent(&self) -> Result<Option<StoredListing>> {
        Ok(self
            .lock()
            .iter()
            .filter(|l| l.posted_at.is_some())
            .max_by_key(|l| l.posted_at)
            .cloned())
    }

    async fn insert(&self, candidate: ListingCandidate) -> Result<StoredListing> {
        let mut listings = self.lock();
        if listings.iter().any(|l| l.source_url == candidate.source_url) {
            bail!("listing already collected: {}", candidate.source_url);
        }

        let id = listings.len() as i64 + 1;
        let stored = StoredListing::from_candidate(id, candidate, Utc::now());
        listings.push(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn collects_in_order_and_rejects_duplicates() {
        let store = CollectingStore::new();
        store.insert(ListingCandidate::new("a", "u1")).await.unwrap();
        store
            .insert(
                ListingCandidate::new("b", "u2")
                    .with_posted_at(Some(Utc.with_ymd_and_hms(2024, 8, 2, 0, 0, 0).unwrap())),
            )
            .await
            .unwrap();
        assert!(store.insert(ListingCandidate::new("c", "u1")).await.is_err());

        let latest = store.latest_posted_at().await.unwrap();
        assert_eq!(latest, Some(Utc.with_ymd_and_hms(2024, 8, 2, 0, 0, 0).unwrap()));

        let titles: Vec<_> = store.into_candidates().into_iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }
}
