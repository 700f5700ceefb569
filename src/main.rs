//! # News Sentiment
//!
//! Scrapes news articles, scores the sentiment of every sentence with a
//! pluggable backend, and reports one polarity in `[-1, 1]` per article.
//!
//! ## Features
//!
//! - Indexes an Al Jazeera section page, or replays a saved `articles.json`
//! - Cleans scraper residue (anchors, entities, italics) out of article text
//! - Splits text into sentences with abbreviation-aware boundaries
//! - Scores sentences with a TextBlob-style lexicon or a remote classifier
//! - Writes a JSON report and an SVG bar chart of per-article polarity
//!
//! ## Usage
//!
//! ```sh
//! news_sentiment --textblob -j ./json
//! ```
//!
//! ## Architecture
//!
//! 1. **Loading**: resolve settings, then load the sentiment backend once
//! 2. **Fetching**: index and download articles, or read the cache
//! 3. **Processing**: clean, segment, score and aggregate each article
//!    (`--concurrency` at a time, results kept in input order)
//! 4. **Output**: write `sentiment_{backend}.json` and the chart

use clap::Parser;
use futures::stream;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cleaner;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod segmenter;
mod sentiment;
mod utils;

use cli::Cli;
use config::Settings;
use error::PipelineError;
use models::Article;
use outputs::{chart, json};
use pipeline::{CancelToken, PipelineRunner};
use segmenter::SentenceSegmenter;
use sentiment::{SentimentBackend, load_backend};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_sentiment starting up");

    // Parse CLI and resolve settings
    let args = Cli::parse();
    let settings = Settings::load(&args)?;
    debug!(?settings.backend, ?settings.json_output_dir, ?settings.run, "Resolved settings");

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&settings.json_output_dir).await {
        error!(
            path = %settings.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Load backend before any article is touched ----
    let backend = load_backend(
        settings.backend,
        settings.lexicon_extensions.as_deref(),
        &settings.neural,
    )
    .await?;

    // ---- Index and fetch articles ----
    let articles = gather_articles(&settings).await?;
    info!(count = articles.len(), "Total articles to analyze");

    // ---- Score ----
    let cancel = CancelToken::new();
    let ctrl_c = stream::unfold((), |()| async {
        tokio::signal::ctrl_c().await.ok().map(|()| ((), ()))
    });
    tokio::spawn(cancel.clone().watch_interrupts(ctrl_c, || {
        std::process::exit(130);
    }));

    let runner = PipelineRunner::new(
        &backend,
        SentenceSegmenter::new(settings.segmenter_max_length),
        settings.run,
    )
    .with_cancel_token(cancel);
    let report = runner.run(articles).await?;

    info!(
        scored = report.scored.len(),
        failed = report.failures.len(),
        cancelled = report.cancelled,
        "Completed article processing"
    );
    for article in &report.scored {
        info!(title = %article.title, polarity = article.polarity, "Article sentiment");
    }

    // ---- Outputs ----
    if let Err(e) = json::write_report(&report, backend.name(), &settings.json_output_dir).await {
        error!(error = %e, "Failed to write sentiment report");
    }
    if let Err(e) = chart::write_bar_chart(&report.series(), &settings.chart_path).await {
        error!(path = %settings.chart_path.display(), error = %e, "Failed to write sentiment chart");
    }

    if report.cancelled {
        let completed = report.scored.len() + report.failures.len();
        return Err(PipelineError::Cancelled { completed }.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Articles for this run, from the cache file or a fresh scrape.
///
/// A fresh scrape is saved to `articles.json` before scoring starts.
async fn gather_articles(settings: &Settings) -> Result<Vec<Article>, Box<dyn Error>> {
    if let Some(input) = &settings.input {
        return scrapers::cache::load_articles(input).await;
    }

    let links =
        scrapers::aljazeera::index_articles(&settings.section_url, settings.max_articles).await?;
    let articles = scrapers::aljazeera::fetch_articles(links).await;

    match json::write_articles(&articles, &settings.json_output_dir).await {
        Ok(path) => debug!(path = %path.display(), "Article cache saved"),
        Err(e) => error!(error = %e, "Failed to write article cache"),
    }
    Ok(articles)
}
