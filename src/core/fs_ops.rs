// src/core/fs_ops.rs
//! File system helpers for the database file and collect-only output

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::info;

pub struct FsOps;

impl FsOps {
    pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
            info!("Created directory: {}", path.display());
        }
        Ok(())
    }

    pub async fn write_file_safe(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir_exists(parent).await?;
        }

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display()))?;

        info!("Written file: {}", path.display());
        Ok(())
    }

    /// Pretty-printed JSON dump
    pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        Self::write_file_safe(path, &content).await
    }
}
