// src/types/listing.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One step of a candidate's work history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub date_range: String,
    pub job_title: String,
}

/// A spoken language and, where the board states it, the level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSkill {
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl LanguageSkill {
    pub fn new(language: impl Into<String>, level: Option<String>) -> Self {
        Self {
            language: language.into(),
            level,
        }
    }
}

/// Resume/profile attributes some boards expose on the detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub employment_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub education: Vec<String>,
    /// Highest formal qualification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    /// Experience in the occupational field, as the board summarizes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experience_entries: Vec<ExperienceEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<LanguageSkill>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mobility: Vec<String>,
}

impl ListingDetails {
    pub fn is_empty(&self) -> bool {
        self.availability.is_none()
            && self.employment_types.is_empty()
            && self.education.is_empty()
            && self.qualification.is_none()
            && self.experience.is_none()
            && self.experience_entries.is_empty()
            && self.skills.is_empty()
            && self.additional_skills.is_empty()
            && self.languages.is_empty()
            && self.mobility.is_empty()
    }
}

/// A freshly extracted listing that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingCandidate {
    pub title: String,
    pub description: String,
    pub location: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub salary: Option<String>,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "ListingDetails::is_empty")]
    pub details: ListingDetails,
}

impl ListingCandidate {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            location: String::new(),
            posted_at: None,
            salary: None,
            source_url: source_url.into(),
            details: ListingDetails::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_posted_at(mut self, posted_at: Option<DateTime<Utc>>) -> Self {
        self.posted_at = posted_at;
        self
    }

    pub fn with_salary(mut self, salary: Option<String>) -> Self {
        self.salary = salary;
        self
    }

    /// Whether the listing is at or before the watermark.
    ///
    /// Undated listings are never considered processed.
    pub fn is_processed(&self, watermark: &Watermark) -> bool {
        matches!(self.posted_at, Some(posted) if posted <= watermark.last_processed)
    }
}

/// A persisted listing, identity and creation time assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredListing {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub salary: Option<String>,
    pub source_url: String,
    pub details: ListingDetails,
    pub created_at: DateTime<Utc>,
}

impl StoredListing {
    pub fn from_candidate(id: i64, candidate: ListingCandidate, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: candidate.title,
            description: candidate.description,
            location: candidate.location,
            posted_at: candidate.posted_at,
            salary: candidate.salary,
            source_url: candidate.source_url,
            details: candidate.details,
            created_at,
        }
    }
}

/// Latest listing date already stored. Fixed for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub last_processed: DateTime<Utc>,
}

impl Watermark {
    pub fn new(last_processed: DateTime<Utc>) -> Self {
        Self { last_processed }
    }

    /// Watermark for an empty store.
    pub fn origin() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn from_latest(latest: Option<DateTime<Utc>>) -> Self {
        latest.map(Self::new).unwrap_or_else(Self::origin)
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::origin()
    }
}
