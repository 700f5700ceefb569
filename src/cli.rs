//! Command-line interface definitions for News Sentiment.
//!
//! Every option that can also come from the YAML config file is an `Option`
//! here, so that [`crate::config::Settings::resolve`] can tell "not given"
//! apart from "given with the default value".

use crate::sentiment::BackendChoice;
use clap::Parser;

/// Command-line arguments for the News Sentiment application.
///
/// # Examples
///
/// ```sh
/// # Scrape the default section and score with the neural backend
/// news_sentiment -j ./json --inference-token YOUR_TOKEN
///
/// # Rerun a saved article cache with the lexicon backend
/// news_sentiment --textblob -i ./json/articles.json
///
/// # Four articles in flight, stop at the first failure
/// news_sentiment -c config.yaml --concurrency 4 --fail-fast
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Sentiment backend to score sentences with
    #[arg(long, value_enum)]
    pub backend: Option<BackendChoice>,

    /// Use the lexicon (TextBlob-style) backend; shorthand for `--backend lexicon`
    #[arg(long, conflicts_with = "backend")]
    pub textblob: bool,

    /// Output directory for articles.json and the sentiment report
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Where to write the per-article sentiment chart (SVG)
    #[arg(long)]
    pub chart_path: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Read articles from a saved articles.json instead of scraping
    #[arg(short, long)]
    pub input: Option<String>,

    /// Al Jazeera section page to index
    #[arg(long)]
    pub section_url: Option<String>,

    /// Maximum number of articles taken from the section page
    #[arg(long)]
    pub max_articles: Option<usize>,

    /// Number of articles processed at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Abort the whole batch on the first article that fails
    #[arg(long)]
    pub fail_fast: bool,

    /// Bearer token for the neural inference endpoint
    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true)]
    pub inference_token: Option<String>,
}

impl Cli {
    /// Backend requested on the command line, if any.
    pub fn backend_choice(&self) -> Option<BackendChoice> {
        if self.textblob {
            Some(BackendChoice::Lexicon)
        } else {
            self.backend
        }
    }
}
