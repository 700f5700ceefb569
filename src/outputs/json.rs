//! JSON artifacts of a run.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── articles.json            # raw fetched articles, replayable with --input
//! ├── sentiment_lexicon.json   # report of a lexicon run
//! └── sentiment_neural.json    # report of a neural run
//! ```

use crate::models::{Article, ArticleFailure, RunReport, ScoredArticle};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const ARTICLES_FILENAME: &str = "articles.json";

/// What gets written to `sentiment_{backend}.json`.
#[derive(Debug, Serialize)]
pub struct SentimentReport<'a> {
    pub generated_at: String,
    pub backend: &'a str,
    pub cancelled: bool,
    pub articles: &'a [ScoredArticle],
    pub failures: &'a [ArticleFailure],
}

impl<'a> SentimentReport<'a> {
    pub fn new(report: &'a RunReport, backend: &'a str) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            backend,
            cancelled: report.cancelled,
            articles: &report.scored,
            failures: &report.failures,
        }
    }
}

/// Save fetched articles, pretty-printed, before any processing.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, count = articles.len()))]
pub async fn write_articles(
    articles: &[Article],
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(articles)?;
    let path = PathBuf::from(json_output_dir).join(ARTICLES_FILENAME);
    write_file(&path, json).await?;
    info!(path = %path.display(), "Wrote article cache");
    Ok(path)
}

/// Save per-article polarity, sentence scores and failures of a run.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, backend = %backend))]
pub async fn write_report(
    report: &RunReport,
    backend: &str,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(&SentimentReport::new(report, backend))?;
    let path = PathBuf::from(json_output_dir).join(format!("sentiment_{backend}.json"));
    write_file(&path, json).await?;
    info!(path = %path.display(), articles = report.scored.len(), "Wrote sentiment report");
    Ok(path)
}

async fn write_file(path: &Path, contents: String) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }
    fs::write(path, contents).await?;
    Ok(())
}
