pub mod listing;

pub use listing::{
    ExperienceEntry, LanguageSkill, ListingCandidate, ListingDetails, StoredListing, Watermark,
};
