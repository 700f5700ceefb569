//! Pluggable sentence-level sentiment scoring.
//!
//! A [`SentimentBackend`] turns one sentence into a signed polarity in
//! `[-1, 1]`, or declines to score it. Two variants exist:
//!
//! | Variant | Module | Per-sentence failure |
//! |---------|--------|----------------------|
//! | Lexicon (TextBlob-style) | [`lexicon`] | cannot fail |
//! | Neural (Flair-style classifier) | [`neural`] | sentence is skipped |
//!
//! The variant is chosen once per run through [`BackendChoice`] and loaded by
//! [`load_backend`]; the pipeline only ever sees the trait.

pub mod lexicon;
pub mod neural;

use crate::error::PipelineError;
use crate::models::SentimentResult;
use clap::ValueEnum;
use lexicon::LexiconBackend;
use neural::{HttpClassifier, NeuralBackend, NeuralSettings, RetryClassify};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{error, info, instrument};

/// Scores a single sentence.
///
/// Returning `None` means the backend has no opinion on the sentence; the
/// aggregator leaves it out of both the sum and the count.
pub trait SentimentBackend {
    /// Short identifier used in logs and output file names.
    fn name(&self) -> &'static str;

    async fn score(&self, sentence: &str) -> Option<SentimentResult>;
}

/// Which backend variant a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    Lexicon,
    #[default]
    Neural,
}

impl BackendChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendChoice::Lexicon => "lexicon",
            BackendChoice::Neural => "neural",
        }
    }
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The backend selected for this run, ready to score.
#[derive(Debug)]
pub enum ConfiguredBackend {
    Lexicon(LexiconBackend),
    Neural(NeuralBackend<RetryClassify<HttpClassifier>>),
}

impl SentimentBackend for ConfiguredBackend {
    fn name(&self) -> &'static str {
        match self {
            ConfiguredBackend::Lexicon(b) => b.name(),
            ConfiguredBackend::Neural(b) => b.name(),
        }
    }

    async fn score(&self, sentence: &str) -> Option<SentimentResult> {
        match self {
            ConfiguredBackend::Lexicon(b) => b.score(sentence).await,
            ConfiguredBackend::Neural(b) => b.score(sentence).await,
        }
    }
}

/// Initialise the chosen backend.
///
/// This is the only place models or tables are loaded; it runs once before
/// any article is processed.
///
/// # Errors
///
/// [`PipelineError::BackendUnavailable`] when the lexicon extensions cannot be
/// read or the classifier endpoint does not answer a probe request. Either is
/// fatal for the run.
#[instrument(level = "info", skip_all, fields(backend = %choice))]
pub async fn load_backend(
    choice: BackendChoice,
    lexicon_extensions: Option<&Path>,
    neural: &NeuralSettings,
) -> Result<ConfiguredBackend, PipelineError> {
    let backend = match choice {
        BackendChoice::Lexicon => {
            let backend = match lexicon_extensions {
                Some(path) => LexiconBackend::with_extensions(path)?,
                None => LexiconBackend::new(),
            };
            ConfiguredBackend::Lexicon(backend)
        }
        BackendChoice::Neural => {
            let http = HttpClassifier::new(neural).map_err(|e| unavailable(choice.as_str(), e))?;
            let classifier = RetryClassify::new(http, neural.max_retries, neural.base_delay);
            ConfiguredBackend::Neural(NeuralBackend::load(classifier).await?)
        }
    };

    match &backend {
        ConfiguredBackend::Lexicon(b) => info!(entries = b.lexicon_len(), "Lexicon backend ready"),
        ConfiguredBackend::Neural(_) => info!(endpoint = %neural.endpoint, "Neural backend ready"),
    }
    Ok(backend)
}

/// Log-and-wrap helper for load failures.
pub(crate) fn unavailable(backend: &str, reason: impl fmt::Display) -> PipelineError {
    let reason = reason.to_string();
    error!(%backend, %reason, "Sentiment backend failed to load");
    PipelineError::BackendUnavailable {
        backend: backend.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_choice_is_neural() {
        assert_eq!(BackendChoice::default(), BackendChoice::Neural);
    }

    #[test]
    fn test_choice_deserializes_lowercase() {
        let choice: BackendChoice = serde_yaml::from_str("lexicon").unwrap();
        assert_eq!(choice, BackendChoice::Lexicon);
        assert!(serde_yaml::from_str::<BackendChoice>("vader").is_err());
    }

    #[test]
    fn test_choice_display() {
        assert_eq!(BackendChoice::Lexicon.to_string(), "lexicon");
        assert_eq!(BackendChoice::Neural.to_string(), "neural");
    }

    #[tokio::test]
    async fn test_load_lexicon_backend() {
        let backend = load_backend(BackendChoice::Lexicon, None, &NeuralSettings::default())
            .await
            .unwrap();
        assert_eq!(backend.name(), "lexicon");
        let result = backend.score("A wonderful day.").await.unwrap();
        assert!(result.value > 0.0);
    }

    #[tokio::test]
    async fn test_missing_extensions_file_is_fatal() {
        let err = load_backend(
            BackendChoice::Lexicon,
            Some(Path::new("/definitely/not/here.yaml")),
            &NeuralSettings::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::BackendUnavailable { .. }));
    }
}
