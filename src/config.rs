//! Run settings.
//!
//! Settings come from three layers, highest first: command-line flags, the
//! optional YAML file named by `--config`, and built-in defaults. They are
//! resolved once into [`Settings`] before any network or disk work starts.
//!
//! ```yaml
//! backend: lexicon
//! source:
//!   section_url: https://www.aljazeera.com/where/mozambique/
//!   max_articles: 10
//! neural:
//!   endpoint: https://router.huggingface.co/hf-inference/models/...
//!   max_retries: 3
//!   timeout_secs: 30
//! lexicon:
//!   extensions: ./lexicon_extra.yaml
//! segmenter:
//!   max_length: 1000000
//! pipeline:
//!   concurrency: 4
//!   fail_fast: false
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::pipeline::RunOptions;
use crate::scrapers::aljazeera::{DEFAULT_MAX_ARTICLES, DEFAULT_SECTION_URL};
use crate::segmenter::DEFAULT_MAX_LENGTH;
use crate::sentiment::BackendChoice;
use crate::sentiment::neural::NeuralSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const DEFAULT_JSON_OUTPUT_DIR: &str = ".";
pub const DEFAULT_CHART_PATH: &str = "article_sentiment_graph.svg";

/// Contents of the YAML config file. Every field is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub backend: Option<BackendChoice>,
    pub source: SourceSection,
    pub neural: NeuralSection,
    pub lexicon: LexiconSection,
    pub segmenter: SegmenterSection,
    pub pipeline: PipelineSection,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSection {
    pub section_url: Option<String>,
    pub max_articles: Option<usize>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NeuralSection {
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub max_retries: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LexiconSection {
    /// YAML word table merged over the built-in lexicon.
    pub extensions: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SegmenterSection {
    pub max_length: Option<usize>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    pub concurrency: Option<usize>,
    pub fail_fast: Option<bool>,
}

impl FileConfig {
    pub fn from_yaml(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        // An empty file deserializes to unit, not a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })
    }

    #[instrument(level = "debug")]
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_yaml(&raw, path)?;
        debug!(?config, "Parsed config file");
        Ok(config)
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendChoice,
    pub input: Option<PathBuf>,
    pub section_url: String,
    pub max_articles: usize,
    pub json_output_dir: String,
    pub chart_path: PathBuf,
    pub neural: NeuralSettings,
    pub lexicon_extensions: Option<PathBuf>,
    pub segmenter_max_length: usize,
    pub run: RunOptions,
}

impl Settings {
    /// Read the config file named on the command line, if any, and resolve.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match cli.config.as_deref() {
            Some(path) => {
                let file = FileConfig::from_path(path)?;
                info!(config_path = path, "Loaded configuration");
                file
            }
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    /// Layer command-line flags over the file config over defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for a concurrency, article limit or segmenter
    /// length of zero.
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let defaults = NeuralSettings::default();
        let neural = NeuralSettings {
            endpoint: file.neural.endpoint.unwrap_or(defaults.endpoint),
            api_token: cli.inference_token.clone().or(file.neural.api_token),
            max_retries: file.neural.max_retries.unwrap_or(defaults.max_retries),
            timeout: file
                .neural
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            ..defaults
        };

        let concurrency = cli
            .concurrency
            .or(file.pipeline.concurrency)
            .unwrap_or(RunOptions::default().concurrency);
        if concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }

        let max_articles = cli
            .max_articles
            .or(file.source.max_articles)
            .unwrap_or(DEFAULT_MAX_ARTICLES);
        if max_articles == 0 {
            return Err(ConfigError::Invalid("max_articles must be at least 1".into()));
        }

        let segmenter_max_length = file.segmenter.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        if segmenter_max_length == 0 {
            return Err(ConfigError::Invalid("segmenter.max_length must be at least 1".into()));
        }

        Ok(Self {
            backend: cli.backend_choice().or(file.backend).unwrap_or_default(),
            input: cli.input.as_deref().map(PathBuf::from),
            section_url: cli
                .section_url
                .clone()
                .or(file.source.section_url)
                .unwrap_or_else(|| DEFAULT_SECTION_URL.to_string()),
            max_articles,
            json_output_dir: cli
                .json_output_dir
                .clone()
                .unwrap_or_else(|| DEFAULT_JSON_OUTPUT_DIR.to_string()),
            chart_path: Path::new(cli.chart_path.as_deref().unwrap_or(DEFAULT_CHART_PATH))
                .to_path_buf(),
            neural,
            lexicon_extensions: file.lexicon.extensions,
            segmenter_max_length,
            run: RunOptions {
                concurrency,
                fail_fast: cli.fail_fast || file.pipeline.fail_fast.unwrap_or(false),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["news_sentiment"];
        argv.extend_from_slice(args);
        let mut cli = Cli::parse_from(argv);
        // Keep the environment out of precedence tests.
        if !args.contains(&"--inference-token") {
            cli.inference_token = None;
        }
        cli
    }

    const YAML: &str = r#"
backend: lexicon
source:
  section_url: https://www.aljazeera.com/where/kenya/
  max_articles: 5
neural:
  endpoint: http://localhost:8080/classify
  api_token: from-file
  timeout_secs: 5
lexicon:
  extensions: extra.yaml
pipeline:
  concurrency: 3
  fail_fast: true
"#;

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&cli(&[]), FileConfig::default()).unwrap();
        assert_eq!(settings.backend, BackendChoice::Neural);
        assert_eq!(settings.section_url, DEFAULT_SECTION_URL);
        assert_eq!(settings.max_articles, 10);
        assert_eq!(settings.json_output_dir, ".");
        assert_eq!(settings.chart_path, PathBuf::from("article_sentiment_graph.svg"));
        assert_eq!(settings.run.concurrency, 1);
        assert!(!settings.run.fail_fast);
        assert!(settings.input.is_none());
        assert_eq!(settings.segmenter_max_length, DEFAULT_MAX_LENGTH);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = FileConfig::from_yaml(YAML, "config.yaml").unwrap();
        let settings = Settings::resolve(&cli(&[]), file).unwrap();
        assert_eq!(settings.backend, BackendChoice::Lexicon);
        assert_eq!(settings.section_url, "https://www.aljazeera.com/where/kenya/");
        assert_eq!(settings.max_articles, 5);
        assert_eq!(settings.neural.endpoint, "http://localhost:8080/classify");
        assert_eq!(settings.neural.api_token.as_deref(), Some("from-file"));
        assert_eq!(settings.neural.timeout, Duration::from_secs(5));
        assert_eq!(settings.neural.max_retries, 3);
        assert_eq!(settings.lexicon_extensions, Some(PathBuf::from("extra.yaml")));
        assert_eq!(settings.run.concurrency, 3);
        assert!(settings.run.fail_fast);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig::from_yaml(YAML, "config.yaml").unwrap();
        let args = cli(&[
            "--backend",
            "neural",
            "--max-articles",
            "2",
            "--concurrency",
            "8",
            "--inference-token",
            "from-cli",
        ]);
        let settings = Settings::resolve(&args, file).unwrap();
        assert_eq!(settings.backend, BackendChoice::Neural);
        assert_eq!(settings.max_articles, 2);
        assert_eq!(settings.run.concurrency, 8);
        assert_eq!(settings.neural.api_token.as_deref(), Some("from-cli"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = Settings::resolve(&cli(&["--concurrency", "0"]), FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let file = FileConfig::from_yaml("pipeline:\n  concurrency: 0\n", "c.yaml").unwrap();
        assert!(Settings::resolve(&cli(&[]), file).is_err());
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(FileConfig::from_yaml("  \n", "c.yaml").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = FileConfig::from_yaml("backend: lexicon\nsorce: {}\n", "c.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(FileConfig::from_yaml("backend: vader\n", "c.yaml").is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap();

        let config = FileConfig::from_path(path).unwrap();
        assert_eq!(config.backend, Some(BackendChoice::Lexicon));
        assert_eq!(config.pipeline.concurrency, Some(3));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = FileConfig::from_path("/no/such/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_without_config_file() {
        let settings = Settings::load(&cli(&["--textblob", "-j", "/tmp/out"])).unwrap();
        assert_eq!(settings.backend, BackendChoice::Lexicon);
        assert_eq!(settings.json_output_dir, "/tmp/out");
    }
}
