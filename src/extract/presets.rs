// src/extract/presets.rs
//! Built-in knowledge about the supported job boards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::rules::{Field, LinkRuleSpec, RuleSpec};
use crate::classifier::DEFAULT_EXCLUDE_KEYWORDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// kleinanzeigen.de job ads, numbered result pages
    Kleinanzeigen,
    /// arbeitsagentur.de candidate board, "load more" results
    Arbeitsagentur,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Kleinanzeigen => f.write_str("kleinanzeigen"),
            SourceKind::Arbeitsagentur => f.write_str("arbeitsagentur"),
        }
    }
}

/// How result pages are traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkMode {
    Numbered,
    LoadMore,
}

#[derive(Debug, Clone)]
pub struct SourcePreset {
    pub base_url: &'static str,
    /// Result page URL, `{page}` is replaced by the 1-based page index.
    pub search_url: &'static str,
    pub walk: WalkMode,
    pub links: LinkRuleSpec,
    pub next_control: Option<&'static str>,
    pub load_more_control: Option<&'static str>,
    pub fields: BTreeMap<Field, RuleSpec>,
    pub exclude_keywords: Vec<String>,
    pub max_pages: u32,
    pub max_results: Option<usize>,
}

impl SourceKind {
    pub fn preset(self) -> SourcePreset {
        match self {
            SourceKind::Kleinanzeigen => kleinanzeigen(),
            SourceKind::Arbeitsagentur => arbeitsagentur(),
        }
    }
}

fn kleinanzeigen() -> SourcePreset {
    SourcePreset {
        base_url: "https://www.kleinanzeigen.de",
        search_url: "https://www.kleinanzeigen.de/s-jobs/seite:{page}/c102",
        walk: WalkMode::Numbered,
        links: LinkRuleSpec::new("a.ellipsis"),
        next_control: None,
        load_more_control: None,
        fields: BTreeMap::from([
            (Field::Title, RuleSpec::attr(r#"meta[itemprop="name"]"#, "content")),
            (
                Field::Description,
                RuleSpec::attr(r#"meta[itemprop="description"]"#, "content"),
            ),
            (Field::Location, RuleSpec::text(r#"span[itemprop="locality"]"#)),
            (
                Field::PostedAt,
                RuleSpec::next_sibling("#viewad-extra-info .icon-calendar-gray-simple"),
            ),
            (
                Field::Salary,
                RuleSpec::labeled(
                    ".addetailslist--detail",
                    "Stundenlohn",
                    ".addetailslist--detail--value",
                ),
            ),
        ]),
        exclude_keywords: DEFAULT_EXCLUDE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        max_pages: 3,
        max_results: None,
    }
}

fn arbeitsagentur() -> SourcePreset {
    SourcePreset {
        base_url: "https://www.arbeitsagentur.de",
        search_url: "https://www.arbeitsagentur.de/bewerberboerse/suche?entfernungGrob=0&sort=veroeffdatum&angebotsart=1&page={page}",
        walk: WalkMode::LoadMore,
        links: LinkRuleSpec::new(r#"a[id^="ergebnisliste-item-"]"#)
            .with_prefix("https://www.arbeitsagentur.de/bewerberboerse/bewerberdetail/"),
        next_control: None,
        load_more_control: Some("#ergebnisliste-ladeweitere-button"),
        fields: BTreeMap::from([
            (Field::Title, RuleSpec::text("#detail-kopfbereich-titel")),
            (Field::PostedAt, RuleSpec::text("#detail-metalane-veroeffentlicht")),
            (Field::Availability, RuleSpec::text("#detail-kopfbereich-verfuegbarkeit")),
            (
                Field::EmploymentTypes,
                RuleSpec::list(r#"[id^="detail-kopfbereich-arbeitszeit-"]"#),
            ),
            (Field::Location, RuleSpec::text("#detail-kopfbereich-lokation-0")),
            (
                Field::Description,
                RuleSpec::text("#detail-lebenslauf-letzte-taetigkeit"),
            ),
            (
                Field::Education,
                RuleSpec::list(r#"[id^="detail-lebenslauf-ausbildung-"]"#),
            ),
            (Field::Qualification, RuleSpec::text("#detail-lebenslauf-abschluss")),
            (
                Field::Experience,
                RuleSpec::text("#detail-lebenslauf-berufsfelderfahrung-0"),
            ),
            (
                Field::ExperienceEntries,
                RuleSpec::pairs(
                    r#"[id^="detail-lebenslauf-listenitem-werdegang-"]"#,
                    ".detailansicht-lebenslauf-listenitem-timespan",
                    ".detailansicht-lebenslauf-listenitem-content-header",
                ),
            ),
            (
                Field::Skills,
                RuleSpec::list("#detail-bewerberdetail-kompetenzen ul li"),
            ),
            (
                Field::AdditionalSkills,
                RuleSpec::list("#detail-bewerberdetail-kenntnisse ul li"),
            ),
            (
                Field::Languages,
                RuleSpec::pairs("#detail-bewerberdetail-sprachkenntnisse ul li", "p", "p + *"),
            ),
            (
                Field::Mobility,
                RuleSpec::list("#detail-bewerberdetail-mobilitaet + ul li"),
            ),
        ]),
        exclude_keywords: Vec::new(),
        max_pages: 4,
        max_results: Some(100),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::rules::DetailRules;

    #[test]
    fn every_preset_compiles() {
        for kind in [SourceKind::Kleinanzeigen, SourceKind::Arbeitsagentur] {
            let preset = kind.preset();
            DetailRules::compile(&preset.fields).unwrap();
            preset.links.compile().unwrap();
            assert!(preset.search_url.contains("{page}"), "{kind}");
        }
    }

    #[test]
    fn load_more_sources_name_their_control() {
        for kind in [SourceKind::Kleinanzeigen, SourceKind::Arbeitsagentur] {
            let preset = kind.preset();
            if preset.walk == WalkMode::LoadMore {
                assert!(preset.load_more_control.is_some(), "{kind}");
            }
        }
    }
}
