//! Replay articles saved by an earlier run.
//!
//! Reads the `articles.json` written after fetching (`[{url, title, text}]`)
//! so the pipeline can be rerun offline or with another backend.

use crate::models::Article;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_articles(path: &Path) -> Result<Vec<Article>, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    let articles: Vec<Article> = serde_json::from_str(&raw)?;
    info!(count = articles.len(), "Loaded cached articles");
    Ok(articles)
}
