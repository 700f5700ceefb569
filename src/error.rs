//! Error types for the sentiment pipeline.
//!
//! Errors fall into two classes:
//!
//! - **Fatal**: the run cannot proceed ([`PipelineError::BackendUnavailable`],
//!   [`PipelineError::Cancelled`], [`PipelineError::ArticleFailed`] in fail-fast mode).
//! - **Per-article**: one article cannot be scored, its siblings are unaffected
//!   ([`PipelineError::EmptyAggregationInput`], [`PipelineError::SegmentationFailure`]).

use std::time::Duration;
use thiserror::Error;

/// Errors raised while turning articles into polarity scores.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The sentiment model could not be initialised.
    #[error("sentiment backend `{backend}` unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// No sentence of the article produced a score, so there is nothing to average.
    #[error("no scored sentences to aggregate")]
    EmptyAggregationInput,

    /// The sentence boundary model rejected the text.
    #[error("sentence segmentation failed: {0}")]
    SegmentationFailure(String),

    /// The batch was aborted before every article was processed.
    #[error("run cancelled after {completed} article(s)")]
    Cancelled { completed: usize },

    /// A per-article failure escalated because fail-fast is enabled.
    #[error("article `{title}` failed: {source}")]
    ArticleFailed {
        title: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Whether the error only concerns a single article and can be isolated.
    pub fn is_per_article(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptyAggregationInput | PipelineError::SegmentationFailure(_)
        )
    }
}

/// Transport and decoding failures of a remote text classifier.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("inference request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer. `retry_after` carries the server's own wait hint
    /// (`Retry-After`, or `estimated_time` while a hosted model loads).
    #[error("inference endpoint returned {status}: {body}")]
    Status {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    #[error("could not decode inference response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClassifierError {
    /// Whether sending the same request again can succeed.
    ///
    /// Transport failures, `429` and `5xx` are transient. Client errors and
    /// undecodable bodies repeat identically.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClassifierError::Http(e) => !e.is_builder(),
            ClassifierError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            ClassifierError::Decode(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClassifierError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Problems reading or validating run settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in `{path}`: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_article_classification() {
        assert!(PipelineError::EmptyAggregationInput.is_per_article());
        assert!(PipelineError::SegmentationFailure("too long".into()).is_per_article());
        assert!(!PipelineError::Cancelled { completed: 2 }.is_per_article());
        assert!(
            !PipelineError::BackendUnavailable {
                backend: "neural".into(),
                reason: "timeout".into(),
            }
            .is_per_article()
        );
    }

    fn status(status: u16) -> ClassifierError {
        ClassifierError::Status {
            status,
            body: String::new(),
            retry_after: None,
        }
    }

    #[test]
    fn test_classifier_error_retryability() {
        assert!(status(429).is_retryable());
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!status(404).is_retryable());

        let decode = serde_json::from_str::<u8>("not json").unwrap_err();
        assert!(!ClassifierError::Decode(decode).is_retryable());
    }

    #[test]
    fn test_retry_after_only_on_status() {
        let loading = ClassifierError::Status {
            status: 503,
            body: "loading".into(),
            retry_after: Some(Duration::from_secs(20)),
        };
        assert_eq!(loading.retry_after(), Some(Duration::from_secs(20)));
        assert_eq!(status(500).retry_after(), None);
    }

    #[test]
    fn test_article_failed_message_names_article() {
        let err = PipelineError::ArticleFailed {
            title: "Floods in Beira".into(),
            source: Box::new(PipelineError::EmptyAggregationInput),
        };
        let msg = err.to_string();
        assert!(msg.contains("Floods in Beira"));
        assert!(msg.contains("no scored sentences"));
    }
}
