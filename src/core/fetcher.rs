// src/core/fetcher.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Retrieves raw documents. Parsing happens on the caller's side.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })
    }
}
