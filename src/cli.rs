// src/cli.rs
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::CrawlerConfig;
use crate::core::{CollectingStore, Database, FsOps, HttpFetcher, ListingStore, PageFetcher};
use crate::crawler::crawl;
use crate::extract::SourceKind;

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(version, about = "Incremental job board crawler")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (.yaml or .toml), defaults to ./config.yaml when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log JSON lines instead of human readable output
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Write JSON logs to this file instead of stdout
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the database and its schema
    Init,
    /// Crawl the configured board and store new job offers
    Crawl(RunArgs),
    /// Crawl without a database and write the accepted listings to a JSON file
    Collect {
        #[command(flatten)]
        run: RunArgs,

        #[arg(long, short, default_value = "jobDetails.json")]
        output: PathBuf,
    },
    /// Show the date of the most recent stored listing
    Latest,
    /// Show the most recently stored listings
    List {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Board to crawl, overrides the configured source
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    #[arg(long)]
    pub max_pages: Option<u32>,

    #[arg(long)]
    pub max_results: Option<usize>,
}

impl RunArgs {
    fn apply(&self, config: &mut CrawlerConfig) {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = Some(max_pages);
        }
        if let Some(max_results) = self.max_results {
            config.max_results = Some(max_results);
        }
    }
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    let mut config = CrawlerConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Init => {
            let settings = config.compile()?;
            let db = Database::new(&settings.database_path).await?;
            db.health_check().await?;
            println!("✅ Database ready: {}", settings.database_path.display());
            db.close().await;
        }

        Command::Crawl(run) => {
            run.apply(&mut config);
            let settings = config.compile()?;
            info!(source = %settings.source, database = %settings.database_path.display(), "starting crawl");

            let fetcher: Arc<dyn PageFetcher> =
                Arc::new(HttpFetcher::new(&settings.user_agent, settings.timeout)?);
            let db = Database::new(&settings.database_path).await?;

            let result = crawl(&settings, fetcher, &db).await;
            db.close().await;

            let state = result?;
            println!("✅ Crawl finished: {}", state.report);
        }

        Command::Collect { run, output } => {
            run.apply(&mut config);
            let settings = config.compile()?;
            info!(source = %settings.source, output = %output.display(), "starting collect-only crawl");

            let fetcher: Arc<dyn PageFetcher> =
                Arc::new(HttpFetcher::new(&settings.user_agent, settings.timeout)?);
            let store = CollectingStore::new();

            let state = crawl(&settings, fetcher, &store).await?;
            let collected = store.into_candidates();
            FsOps::write_json(&output, &collected).await?;
            println!(
                "✅ {} listings written to {} ({})",
                collected.len(),
                output.display(),
                state.report
            );
        }

        Command::Latest => {
            let db = open_database(&config).await?;
            match db.find_most_recent().await {
                Ok(Some(listing)) => {
                    let date = listing
                        .posted_at
                        .map(|d| d.format("%d.%m.%Y").to_string())
                        .unwrap_or_default();
                    println!("Most recent listing: {} ({})", date, listing.title);
                    println!("   {}", listing.source_url);
                }
                Ok(None) => println!("No dated listings stored yet"),
                Err(e) => {
                    error!("Failed to read latest listing: {:#}", e);
                    println!("❌ Error: {:#}", e);
                }
            }
            db.close().await;
        }

        Command::List { limit } => {
            let db = open_database(&config).await?;
            let repo = db.listings();
            let listings = repo.list_recent(limit).await?;
            let total = repo.count().await?;

            if listings.is_empty() {
                println!("No listings stored yet");
            } else {
                println!("Showing {} of {} stored listings:", listings.len(), total);
                for listing in listings {
                    let date = listing
                        .posted_at
                        .map(|d| d.format("%d.%m.%Y").to_string())
                        .unwrap_or_else(|| "--.--.----".to_string());
                    println!("  #{:<5} {}  {}", listing.id, date, listing.title);
                    if !listing.location.is_empty() {
                        println!("         {}", listing.location);
                    }
                }
            }
            db.close().await;
        }
    }

    Ok(())
}

async fn open_database(config: &CrawlerConfig) -> Result<Database> {
    let path: &Path = &config.database_path;
    Database::new(path).await
}
