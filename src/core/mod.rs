// src/core/mod.rs
//! Collaborators of the crawler: HTTP fetching, persistence, files

pub mod database;
pub mod fetcher;
pub mod fs_ops;
pub mod store;

pub use database::{Database, ListingRepository};
pub use fetcher::{HttpFetcher, PageFetcher, DEFAULT_USER_AGENT};
pub use fs_ops::FsOps;
pub use store::{CollectingStore, ListingStore};
