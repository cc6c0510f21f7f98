// src/extract/mod.rs
//! Field extraction from result and detail pages.

pub mod presets;
pub mod rules;

pub use presets::{SourceKind, SourcePreset, WalkMode};
pub use rules::{
    control_present, parse_selector, DetailRules, Field, FieldValue, LinkRule, LinkRuleSpec,
    RawFields, Rule, RuleSpec,
};

use tracing::debug;

use crate::dates::{parse_listing_date, DateFormat};
use crate::text::clean;
use crate::types::{ExperienceEntry, LanguageSkill, ListingCandidate, ListingDetails};

/// Build a candidate from raw fields. `None` when the page has no title.
pub fn build_candidate(
    source_url: &str,
    fields: &RawFields,
    date_format: &DateFormat,
) -> Option<ListingCandidate> {
    let title = clean_text(fields, Field::Title)?;

    let posted_at = fields.text(Field::PostedAt).and_then(|raw| {
        let parsed = parse_listing_date(raw, date_format);
        if parsed.is_none() {
            debug!(url = source_url, raw, format = %date_format, "unparseable listing date");
        }
        parsed
    });

    Some(ListingCandidate {
        title,
        description: clean_text(fields, Field::Description).unwrap_or_default(),
        location: clean_text(fields, Field::Location).unwrap_or_default(),
        posted_at,
        salary: clean_text(fields, Field::Salary),
        source_url: source_url.to_string(),
        details: ListingDetails {
            availability: clean_text(fields, Field::Availability),
            employment_types: clean_list(fields, Field::EmploymentTypes),
            education: clean_list(fields, Field::Education),
            qualification: clean_text(fields, Field::Qualification),
            experience: clean_text(fields, Field::Experience),
            experience_entries: clean_pairs(fields, Field::ExperienceEntries)
                .map(|(date_range, job_title)| ExperienceEntry {
                    date_range,
                    job_title,
                })
                .collect(),
            skills: clean_list(fields, Field::Skills),
            additional_skills: clean_list(fields, Field::AdditionalSkills),
            languages: clean_pairs(fields, Field::Languages)
                .filter(|(language, _)| !language.is_empty())
                .map(|(language, level)| {
                    LanguageSkill::new(language, Some(level).filter(|l| !l.is_empty()))
                })
                .collect(),
            mobility: clean_list(fields, Field::Mobility),
        },
    })
}

fn clean_text(fields: &RawFields, field: Field) -> Option<String> {
    fields
        .text(field)
        .map(clean)
        .filter(|value| !value.is_empty())
}

fn clean_list(fields: &RawFields, field: Field) -> Vec<String> {
    fields
        .list(field)
        .into_iter()
        .map(clean)
        .filter(|value| !value.is_empty())
        .collect()
}

/// Cleaned pairs; entries with both halves blank are dropped.
fn clean_pairs(fields: &RawFields, field: Field) -> impl Iterator<Item = (String, String)> + '_ {
    fields
        .pairs(field)
        .into_iter()
        .map(|(head, tail)| (clean(head), clean(tail)))
        .filter(|(head, tail)| !head.is_empty() || !tail.is_empty())
}
