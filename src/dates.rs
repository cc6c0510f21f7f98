// src/dates.rs
//! Listing date parsing (`DD.MM.YYYY` and friends).

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

pub const DEFAULT_DATE_FORMAT: &str = "DD.MM.YYYY";

/// A validated, locale-style date pattern translated to a chrono format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    chrono_format: String,
    has_time: bool,
}

impl DateFormat {
    /// Parse a pattern such as `DD.MM.YYYY` or `YYYY-MM-DD HH:mm`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut chrono_format = String::new();
        let (mut day, mut month, mut year, mut has_time) = (false, false, false, false);
        let mut rest = pattern;

        while !rest.is_empty() {
            let (token, len) = if rest.starts_with("YYYY") {
                year = true;
                ("%Y", 4)
            } else if rest.starts_with("YY") {
                year = true;
                ("%y", 2)
            } else if rest.starts_with("DD") {
                day = true;
                ("%d", 2)
            } else if rest.starts_with("MM") {
                month = true;
                ("%m", 2)
            } else if rest.starts_with("HH") {
                has_time = true;
                ("%H", 2)
            } else if rest.starts_with("mm") {
                has_time = true;
                ("%M", 2)
            } else if rest.starts_with("ss") {
                has_time = true;
                ("%S", 2)
            } else if rest.starts_with('%') {
                ("%%", 1)
            } else {
                let ch = rest.chars().next().map(char::len_utf8).unwrap_or(1);
                chrono_format.push_str(&rest[..ch]);
                rest = &rest[ch..];
                continue;
            };
            chrono_format.push_str(token);
            rest = &rest[len..];
        }

        if !(day && month && year) {
            bail!(
                "date format `{}` must contain DD, MM and YYYY (or YY) tokens",
                pattern
            );
        }

        Ok(Self {
            pattern: pattern.to_string(),
            chrono_format,
            has_time,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn parse_exact(&self, value: &str) -> Option<DateTime<Utc>> {
        if self.has_time {
            NaiveDateTime::parse_from_str(value, &self.chrono_format)
                .ok()
                .map(|dt| dt.and_utc())
        } else {
            NaiveDate::parse_from_str(value, &self.chrono_format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        }
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_DATE_FORMAT.to_string(),
            chrono_format: "%d.%m.%Y".to_string(),
            has_time: false,
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Resolve a scraped date string. Returns `None` for empty or malformed input.
///
/// Labelled values (`Veröffentlicht: 30.08.2024`) are handled by falling back
/// to the individual whitespace-separated tokens.
pub fn parse_listing_date(raw: &str, format: &DateFormat) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    format.parse_exact(raw).or_else(|| {
        raw.split_whitespace()
            .map(|token| token.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')')))
            .find_map(|token| format.parse_exact(token))
    })
}
