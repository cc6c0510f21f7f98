// src/classifier.rs
//! Job-offer vs job-seeker classification by keyword.

use std::collections::BTreeSet;

use crate::text::fold;

/// Phrases used by people looking for work rather than offering it.
pub const DEFAULT_EXCLUDE_KEYWORDS: [&str; 4] =
    ["Gesuch", "Ich suche Arbeit", "Job gesucht", "Suche Job"];

/// Case-insensitive exclusion set. Keywords are stored folded and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeKeywords {
    keywords: Vec<String>,
}

impl ExcludeKeywords {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = keywords
            .into_iter()
            .map(|k| fold(k.as_ref().trim()))
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            keywords: set.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// First keyword found in the description, if any.
    pub fn first_match(&self, description: &str) -> Option<&str> {
        if description.is_empty() {
            return None;
        }
        let haystack = fold(description);
        self.keywords
            .iter()
            .find(|k| haystack.contains(k.as_str()))
            .map(String::as_str)
    }

    /// `false` as soon as a single keyword matches.
    pub fn is_job_offer(&self, description: &str) -> bool {
        self.first_match(description).is_none()
    }
}

impl Default for ExcludeKeywords {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDE_KEYWORDS)
    }
}

pub fn is_job_offer(normalized_description: &str, keywords: &ExcludeKeywords) -> bool {
    keywords.is_job_offer(normalized_description)
}
