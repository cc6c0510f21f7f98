pub mod classifier;
pub mod cli;
pub mod config;
pub mod core;
pub mod crawler;
pub mod dates;
pub mod error;
pub mod extract;
pub mod text;
pub mod types;

pub use classifier::{is_job_offer, ExcludeKeywords};
pub use config::{CrawlSettings, CrawlerConfig};
pub use crawler::{crawl, CrawlController, CrawlPhase, CrawlReport, CrawlState};
pub use dates::{parse_listing_date, DateFormat};
pub use error::{CrawlError, FetchError};
pub use extract::SourceKind;
pub use text::clean;
pub use types::{
    ExperienceEntry, LanguageSkill, ListingCandidate, ListingDetails, StoredListing, Watermark,
};
