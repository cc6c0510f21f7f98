// src/core/database.rs
//! SQLite persistence for job listings

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use crate::core::store::ListingStore;
use crate::core::FsOps;
use crate::types::{ListingCandidate, ListingDetails, StoredListing};

// ===== Connection Management =====

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file and run migrations
    pub async fn new(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            FsOps::ensure_dir_exists(parent).await?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url).await.with_context(|| {
            format!("Failed to connect to database: {}", database_path.display())
        })?;

        info!(
            "Database connection established: {}",
            database_path.display()
        );

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs
    pub async fn in_memory() -> Result<Self> {
        // every pooled connection to :memory: would get its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn listings(&self) -> ListingRepository<'_> {
        ListingRepository::new(&self.pool)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_listings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                posted_at TEXT,
                salary TEXT,
                source_url TEXT NOT NULL UNIQUE,
                details TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create job_listings table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_job_listings_posted_at ON job_listings(posted_at);",
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

// ===== Listing Rows =====

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: i64,
    title: String,
    description: String,
    location: String,
    posted_at: Option<DateTime<Utc>>,
    salary: Option<String>,
    source_url: String,
    details: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for StoredListing {
    type Error = anyhow::Error;

    fn try_from(row: ListingRow) -> Result<Self> {
        let details = match row.details.as_deref() {
            Some(json) if !json.is_empty() => serde_json::from_str::<ListingDetails>(json)
                .with_context(|| format!("Corrupt details column for listing {}", row.id))?,
            _ => ListingDetails::default(),
        };

        Ok(StoredListing {
            id: row.id,
            title: row.title,
            description: row.description,
            location: row.location,
            posted_at: row.posted_at,
            salary: row.salary,
            source_url: row.source_url,
            details,
            created_at: row.created_at,
        })
    }
}

const LISTING_COLUMNS: &str =
    "id, title, description, location, posted_at, salary, source_url, details, created_at";

// ===== Listing Repository =====

pub struct ListingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ListingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Listing with the latest `posted_at`; undated rows are ignored
    pub async fn find_most_recent_by_date(&self) -> Result<Option<StoredListing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {LISTING_COLUMNS}
            FROM job_listings
            WHERE posted_at IS NOT NULL
            ORDER BY posted_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .fetch_optional(self.pool)
        .await
        .context("Failed to query most recent listing")?;

        row.map(StoredListing::try_from).transpose()
    }

    pub async fn find_by_url(&self, source_url: &str) -> Result<Option<StoredListing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM job_listings WHERE source_url = ?"
        ))
        .bind(source_url)
        .fetch_optional(self.pool)
        .await?;

        row.map(StoredListing::try_from).transpose()
    }

    /// Insert a new listing. Fails on a duplicate `source_url`.
    pub async fn create(&self, candidate: ListingCandidate) -> Result<StoredListing> {
        let now = Utc::now();
        let details = if candidate.details.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&candidate.details)?)
        };

        let result = sqlx::query(
            r#"
            INSERT INTO job_listings
                (title, description, location, posted_at, salary, source_url, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&candidate.title)
        .bind(&candidate.description)
        .bind(&candidate.location)
        .bind(candidate.posted_at)
        .bind(&candidate.salary)
        .bind(&candidate.source_url)
        .bind(details)
        .bind(now)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to insert listing: {}", candidate.source_url))?;

        let listing_id = result.last_insert_rowid();
        info!("Stored listing #{}: {}", listing_id, candidate.title);

        Ok(StoredListing::from_candidate(listing_id, candidate, now))
    }

    /// Most recently stored listings first
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<StoredListing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {LISTING_COLUMNS}
            FROM job_listings
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(StoredListing::try_from).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_listings")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ListingStore for Database {
    async fn find_most_recent(&self) -> Result<Option<StoredListing>> {
        self.listings().find_most_recent_by_date().await
    }

    async fn insert(&self, candidate: ListingCandidate) -> Result<StoredListing> {
        self.listings().create(candidate).await
    }
}
