// src/config.rs
//! Crawler configuration: file sections per environment, presets, env overrides

use anyhow::{bail, Context, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::classifier::ExcludeKeywords;
use crate::core::DEFAULT_USER_AGENT;
use crate::crawler::load_more::DEFAULT_BATCH_SIZE;
use crate::crawler::RetryPolicy;
use crate::dates::{DateFormat, DEFAULT_DATE_FORMAT};
use crate::extract::{
    parse_selector, DetailRules, Field, LinkRule, LinkRuleSpec, RuleSpec, SourceKind, WalkMode,
};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadMoreConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for LoadMoreConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            batch_size: default_batch_size(),
        }
    }
}

/// One environment section of the config file. Unset values come from the
/// preset of `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrawlerConfig {
    #[serde(default = "default_source")]
    pub source: SourceKind,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub search_url: Option<String>,
    #[serde(default)]
    pub max_pages: Option<u32>,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub exclude_keywords: Option<Vec<String>>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub request_delay_ms: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub load_more: LoadMoreConfig,
    #[serde(default)]
    pub links: Option<LinkRuleSpec>,
    #[serde(default)]
    pub next_control: Option<String>,
    #[serde(default)]
    pub load_more_control: Option<String>,
    /// Per-field overrides merged over the preset's rules.
    #[serde(default)]
    pub fields: BTreeMap<Field, RuleSpec>,
}

fn default_source() -> SourceKind {
    SourceKind::Kleinanzeigen
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/jobs.db")
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self::for_source(default_source())
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: CrawlerConfig,
    #[serde(default)]
    production: Option<CrawlerConfig>,
}

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub source: SourceKind,
    pub database_path: PathBuf,
    pub base_url: Url,
    pub search_url: String,
    pub walk: WalkMode,
    pub max_pages: u32,
    pub max_results: Option<usize>,
    pub links: LinkRule,
    pub next_control: Option<Selector>,
    pub load_more_control: Option<Selector>,
    pub rules: DetailRules,
    pub exclude_keywords: ExcludeKeywords,
    pub date_format: DateFormat,
    pub request_delay: Duration,
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
    pub batch_size: usize,
}

/// Environment name from `JOBSCOUT_ENV` or `ENVIRONMENT`, `local` otherwise.
pub fn current_environment() -> String {
    std::env::var("JOBSCOUT_ENV")
        .or_else(|_| std::env::var("ENVIRONMENT"))
        .unwrap_or_else(|_| "local".to_string())
}

impl CrawlerConfig {
    pub fn for_source(source: SourceKind) -> Self {
        Self {
            source,
            database_path: default_database_path(),
            base_url: None,
            search_url: None,
            max_pages: None,
            max_results: None,
            exclude_keywords: None,
            date_format: default_date_format(),
            request_delay_ms: 0,
            timeout_seconds: default_timeout_seconds(),
            user_agent: None,
            load_more: LoadMoreConfig::default(),
            links: None,
            next_control: None,
            load_more_control: None,
            fields: BTreeMap::new(),
        }
    }

    /// Load the section for the current environment and apply env overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let environment = current_environment();
        info!("Loading configuration for environment: {}", environment);

        let mut config = Self::load_from_file(path, &environment)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Like [`CrawlerConfig::load`], but without a file at the default path
    /// the defaults are used.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    info!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
                    let mut config = Self::default();
                    config.apply_env_overrides()?;
                    Ok(config)
                }
            }
        }
    }

    pub fn load_from_file(path: &Path, environment: &str) -> Result<Self> {
        if !path.exists() {
            bail!("Configuration file not found: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let format = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");
        Self::parse(&content, format, environment)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse file content (`yaml`/`yml` or `toml`) and pick the section.
    pub fn parse(content: &str, format: &str, environment: &str) -> Result<Self> {
        let file: ConfigFile = match format {
            "toml" => toml::from_str(content)?,
            "yaml" | "yml" => serde_yaml::from_str(content)?,
            other => bail!("Unsupported configuration format: {}", other),
        };

        Ok(match (environment, file.production) {
            ("production", Some(production)) => production,
            _ => file.local,
        })
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("JOBSCOUT_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }

        if let Ok(pages) = std::env::var("JOBSCOUT_MAX_PAGES") {
            let pages = pages
                .trim()
                .parse::<u32>()
                .with_context(|| format!("JOBSCOUT_MAX_PAGES is not a number: {}", pages))?;
            self.max_pages = Some(pages);
        }

        Ok(())
    }

    /// Merge with the preset and validate every selector, URL and pattern.
    pub fn compile(&self) -> Result<CrawlSettings> {
        let preset = self.source.preset();

        let base_url = self.base_url.as_deref().unwrap_or(preset.base_url);
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base_url: {}", base_url))?;

        let search_url = self
            .search_url
            .clone()
            .unwrap_or_else(|| preset.search_url.to_string());
        Url::parse(&search_url.replace("{page}", "1"))
            .with_context(|| format!("Invalid search_url: {}", search_url))?;

        let max_pages = self.max_pages.unwrap_or(preset.max_pages);
        if max_pages == 0 {
            bail!("max_pages must be at least 1");
        }

        let links = self
            .links
            .as_ref()
            .unwrap_or(&preset.links)
            .compile()?;

        let next_control = self
            .next_control
            .as_deref()
            .or(preset.next_control)
            .map(parse_selector)
            .transpose()
            .context("invalid next_control")?;

        let load_more_control = self
            .load_more_control
            .as_deref()
            .or(preset.load_more_control)
            .map(parse_selector)
            .transpose()
            .context("invalid load_more_control")?;

        if preset.walk == WalkMode::LoadMore && load_more_control.is_none() {
            bail!("source {} needs a load_more_control selector", self.source);
        }

        let mut field_specs = preset.fields;
        field_specs.extend(self.fields.clone());
        let rules = DetailRules::compile(&field_specs)?;

        let exclude_keywords = match &self.exclude_keywords {
            Some(keywords) => ExcludeKeywords::new(keywords),
            None => ExcludeKeywords::new(&preset.exclude_keywords),
        };

        let date_format = DateFormat::parse(&self.date_format)
            .with_context(|| format!("Invalid date_format: {}", self.date_format))?;

        if self.load_more.batch_size == 0 {
            bail!("load_more.batch_size must be at least 1");
        }

        Ok(CrawlSettings {
            source: self.source,
            database_path: self.database_path.clone(),
            base_url,
            search_url,
            walk: preset.walk,
            max_pages,
            max_results: self.max_results.or(preset.max_results),
            links,
            next_control,
            load_more_control,
            rules,
            exclude_keywords,
            date_format,
            request_delay: Duration::from_millis(self.request_delay_ms),
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            retry: RetryPolicy::new(
                self.load_more.max_attempts,
                Duration::from_millis(self.load_more.interval_ms),
            ),
            batch_size: self.load_more.batch_size,
        })
    }
}
