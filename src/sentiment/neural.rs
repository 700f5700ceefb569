//! Neural sentiment scoring through a pretrained binary classifier.
//!
//! The model itself lives behind a [`Classifier`]: given a sentence it answers
//! with a [`Prediction`] (`POSITIVE`/`NEGATIVE` plus a confidence) or with no
//! label at all. [`NeuralBackend`] maps predictions onto signed scores and
//! skips sentences that come back unlabelled.
//!
//! # Architecture
//!
//! - [`Classifier`]: the model seam, also implemented by test doubles
//! - [`HttpClassifier`]: a hosted text-classification inference endpoint
//! - [`RetryClassify`]: decorator adding exponential backoff to any classifier
//!
//! # Retry Strategy
//!
//! - Maximum 3 retry attempts by default
//! - Exponential backoff starting at 500 ms
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//! - A server wait hint (`Retry-After`, or `estimated_time` while a hosted
//!   model is loading) raises the delay, still under the cap
//! - Only transient failures are retried: transport errors, `429` and `5xx`

use super::{unavailable, SentimentBackend};
use crate::error::{ClassifierError, PipelineError};
use crate::models::{SentimentLabel, SentimentResult};
use crate::utils::truncate_for_log;
use rand::{rng, Rng};
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Default hosted SST-2 sentiment model.
pub const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/hf-inference/models/distilbert/distilbert-base-uncased-finetuned-sst-2-english";

/// Sentence used to check that the model answers before a run starts.
const PROBE_SENTENCE: &str = "This is a good day.";

/// A label with the classifier's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: SentimentLabel,
    pub confidence: f64,
}

/// A binary sentiment classifier.
pub trait Classifier {
    /// Classify one sentence. `Ok(None)` means the model produced no label.
    async fn classify(&self, text: &str) -> Result<Option<Prediction>, ClassifierError>;
}

/// Connection settings for the hosted classifier.
#[derive(Debug, Clone)]
pub struct NeuralSettings {
    pub endpoint: String,
    pub api_token: Option<String>,
    pub max_retries: usize,
    pub base_delay: StdDuration,
    pub timeout: StdDuration,
}

impl Default for NeuralSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_token: None,
            max_retries: 3,
            base_delay: StdDuration::from_millis(500),
            timeout: StdDuration::from_secs(30),
        }
    }
}

/// Scores sentences with a [`Classifier`].
///
/// Sentences that yield no label, or whose classification fails after
/// retries, are skipped rather than scored as zero.
#[derive(Debug)]
pub struct NeuralBackend<C> {
    classifier: C,
}

impl<C: Classifier> NeuralBackend<C> {
    /// Wrap a classifier that is already known to work.
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    /// Wrap a classifier after checking that it answers a probe sentence.
    ///
    /// # Errors
    ///
    /// [`PipelineError::BackendUnavailable`] if the probe fails or comes back
    /// without a recognisable label.
    #[instrument(level = "info", skip_all)]
    pub async fn load(classifier: C) -> Result<Self, PipelineError> {
        let t0 = Instant::now();
        match classifier.classify(PROBE_SENTENCE).await {
            Ok(Some(prediction)) => {
                info!(
                    elapsed_ms = t0.elapsed().as_millis() as u128,
                    label = prediction.label.as_str(),
                    confidence = prediction.confidence,
                    "Classifier answered probe"
                );
                Ok(Self::new(classifier))
            }
            Ok(None) => Err(unavailable(
                "neural",
                "probe sentence returned no recognisable label",
            )),
            Err(e) => Err(unavailable("neural", e)),
        }
    }
}

impl<C: Classifier> SentimentBackend for NeuralBackend<C> {
    fn name(&self) -> &'static str {
        "neural"
    }

    async fn score(&self, sentence: &str) -> Option<SentimentResult> {
        match self.classifier.classify(sentence).await {
            Ok(Some(prediction)) => Some(SentimentResult::from_label(
                prediction.label,
                prediction.confidence,
            )),
            Ok(None) => {
                debug!(sentence = %truncate_for_log(sentence, 80), "No label; skipping sentence");
                None
            }
            Err(e) => {
                warn!(
                    sentence = %truncate_for_log(sentence, 80),
                    error = %e,
                    "Classification failed; skipping sentence"
                );
                None
            }
        }
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Classifier`].
///
/// Only transient errors ([`ClassifierError::is_retryable`]) are retried;
/// anything else is returned after the first attempt. A successful call that
/// yields no label is returned as-is.
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(max(base_delay * 2^(attempt-1), server_hint), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryClassify<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T: Classifier> RetryClassify<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryClassify<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryClassify")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Classifier> Classifier for RetryClassify<T> {
    async fn classify(&self, text: &str) -> Result<Option<Prediction>, ClassifierError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.classify(text).await {
                Ok(prediction) => return Ok(prediction),
                Err(e) if !e.is_retryable() => {
                    warn!(error = %e, "classify() failed with a non-retryable error");
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "classify() exhausted retries"
                        );
                        return Err(e);
                    }

                    let exp = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
                    let backoff = self.base_delay.saturating_mul(1 << exp);
                    let delay = e
                        .retry_after()
                        .map_or(backoff, |hint| backoff.max(hint))
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "classify() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Error body of a hosted model that is still loading.
#[derive(Debug, Deserialize)]
struct LoadingHint {
    estimated_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

/// A hosted text-classification model speaking the common inference JSON
/// shape: `{"inputs": "..."}` in, `[[{"label", "score"}, ...]]` out.
#[derive(Debug)]
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpClassifier {
    pub fn new(settings: &NeuralSettings) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_token: settings.api_token.clone(),
        })
    }
}

impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Option<Prediction>, ClassifierError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&InferenceRequest { inputs: text });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let header_wait = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(StdDuration::from_secs);
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                retry_after: header_wait.or_else(|| estimated_wait(&body)),
                body: truncate_for_log(&body, 300),
            });
        }
        parse_inference_response(&body)
    }
}

/// `estimated_time` of a loading-model error body, in seconds.
fn estimated_wait(body: &str) -> Option<StdDuration> {
    serde_json::from_str::<LoadingHint>(body)
        .ok()?
        .estimated_time
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(StdDuration::from_secs_f64)
}

/// Pick the top-scoring label from an inference response body.
fn parse_inference_response(body: &str) -> Result<Option<Prediction>, ClassifierError> {
    let response: InferenceResponse = serde_json::from_str(body)?;
    let candidates = match response {
        InferenceResponse::Nested(batches) => batches.into_iter().flatten().collect::<Vec<_>>(),
        InferenceResponse::Flat(scores) => scores,
    };

    let best = candidates
        .into_iter()
        .filter(|c| c.score.is_finite())
        .max_by(|a, b| a.score.total_cmp(&b.score));

    Ok(best.and_then(|c| {
        parse_label(&c.label).map(|label| Prediction {
            label,
            confidence: c.score.clamp(0.0, 1.0),
        })
    }))
}

fn parse_label(raw: &str) -> Option<SentimentLabel> {
    match raw.to_ascii_uppercase().as_str() {
        "POSITIVE" | "POS" | "LABEL_1" => Some(SentimentLabel::Positive),
        "NEGATIVE" | "NEG" | "LABEL_0" => Some(SentimentLabel::Negative),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a fixed table; unknown sentences get no label.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedClassifier {
        pub answers: HashMap<String, Prediction>,
        pub failing: Vec<String>,
    }

    impl ScriptedClassifier {
        pub fn with(mut self, sentence: &str, label: SentimentLabel, confidence: f64) -> Self {
            self.answers
                .insert(sentence.to_string(), Prediction { label, confidence });
            self
        }

        pub fn failing_on(mut self, sentence: &str) -> Self {
            self.failing.push(sentence.to_string());
            self
        }
    }

    impl Classifier for ScriptedClassifier {
        async fn classify(&self, text: &str) -> Result<Option<Prediction>, ClassifierError> {
            if self.failing.iter().any(|s| s == text) {
                return Err(ClassifierError::Status {
                    status: 503,
                    body: "model loading".into(),
                    retry_after: None,
                });
            }
            Ok(self.answers.get(text).copied())
        }
    }

    /// Fails a fixed number of times with the given error, then answers positively.
    struct Flaky {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
        error: fn() -> ClassifierError,
    }

    impl Flaky {
        fn new(failures: usize, error: fn() -> ClassifierError) -> Self {
            Self {
                failures_left: AtomicUsize::new(failures),
                calls: AtomicUsize::new(0),
                error,
            }
        }
    }

    fn server_error() -> ClassifierError {
        ClassifierError::Status {
            status: 500,
            body: String::new(),
            retry_after: None,
        }
    }

    impl Classifier for Flaky {
        async fn classify(&self, _text: &str) -> Result<Option<Prediction>, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err((self.error)());
            }
            Ok(Some(Prediction {
                label: SentimentLabel::Positive,
                confidence: 0.9,
            }))
        }
    }

    #[test]
    fn test_parse_nested_response_picks_top_label() {
        let body = r#"[[{"label":"NEGATIVE","score":0.12},{"label":"POSITIVE","score":0.88}]]"#;
        let prediction = parse_inference_response(body).unwrap().unwrap();
        assert_eq!(prediction.label, SentimentLabel::Positive);
        assert_eq!(prediction.confidence, 0.88);
    }

    #[test]
    fn test_parse_flat_response() {
        let body = r#"[{"label":"LABEL_0","score":0.97},{"label":"LABEL_1","score":0.03}]"#;
        let prediction = parse_inference_response(body).unwrap().unwrap();
        assert_eq!(prediction.label, SentimentLabel::Negative);
    }

    #[test]
    fn test_parse_unknown_label_is_no_label() {
        let body = r#"[[{"label":"NEUTRAL","score":0.99}]]"#;
        assert!(parse_inference_response(body).unwrap().is_none());
        assert!(parse_inference_response("[]").unwrap().is_none());
    }

    #[test]
    fn test_parse_garbage_is_decode_error() {
        let err = parse_inference_response(r#"{"error":"Model is loading"}"#).unwrap_err();
        assert!(matches!(err, ClassifierError::Decode(_)));
    }

    #[tokio::test]
    async fn test_score_maps_label_to_signed_value() {
        let backend = NeuralBackend::new(
            ScriptedClassifier::default()
                .with("Rain fell.", SentimentLabel::Negative, 0.75)
                .with("Sun rose.", SentimentLabel::Positive, 0.6),
        );
        assert_eq!(backend.score("Rain fell.").await.unwrap().value, -0.75);
        assert_eq!(backend.score("Sun rose.").await.unwrap().value, 0.6);
        assert!(backend.score("Unlabelled.").await.is_none());
    }

    #[tokio::test]
    async fn test_classifier_error_skips_sentence() {
        let backend = NeuralBackend::new(ScriptedClassifier::default().failing_on("Boom."));
        assert!(backend.score("Boom.").await.is_none());
    }

    #[tokio::test]
    async fn test_load_fails_when_probe_fails() {
        let classifier = ScriptedClassifier::default().failing_on(PROBE_SENTENCE);
        let err = NeuralBackend::load(classifier).await.unwrap_err();
        assert!(matches!(err, PipelineError::BackendUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_load_fails_when_probe_unlabelled() {
        let err = NeuralBackend::load(ScriptedClassifier::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::BackendUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_load_succeeds_when_probe_answers() {
        let classifier =
            ScriptedClassifier::default().with(PROBE_SENTENCE, SentimentLabel::Positive, 0.99);
        assert!(NeuralBackend::load(classifier).await.is_ok());
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let flaky = Flaky::new(2, server_error);
        let retry = RetryClassify::new(flaky, 3, StdDuration::from_millis(10));
        let prediction = retry.classify("ok").await.unwrap().unwrap();
        assert_eq!(prediction.label, SentimentLabel::Positive);
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let flaky = Flaky::new(10, server_error);
        let retry = RetryClassify::new(flaky, 2, StdDuration::from_millis(10));
        assert!(retry.classify("ok").await.is_err());
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_client_error_immediately() {
        let bad_request = || ClassifierError::Status {
            status: 400,
            body: "bad input".into(),
            retry_after: None,
        };
        let retry = RetryClassify::new(Flaky::new(10, bad_request), 3, StdDuration::from_millis(1));
        let err = retry.classify("ok").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Status { status: 400, .. }));
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_returns_decode_error_immediately() {
        let garbled = || ClassifierError::Decode(serde_json::from_str::<u8>("{").unwrap_err());
        let retry = RetryClassify::new(Flaky::new(10, garbled), 3, StdDuration::from_millis(1));
        assert!(matches!(
            retry.classify("ok").await.unwrap_err(),
            ClassifierError::Decode(_)
        ));
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_retries_rate_limit() {
        let rate_limited = || ClassifierError::Status {
            status: 429,
            body: String::new(),
            retry_after: None,
        };
        let retry = RetryClassify::new(Flaky::new(10, rate_limited), 2, StdDuration::from_millis(1));
        assert!(retry.classify("ok").await.is_err());
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_waits_for_server_hint() {
        let loading = || ClassifierError::Status {
            status: 503,
            body: String::new(),
            retry_after: Some(StdDuration::from_millis(300)),
        };
        let retry = RetryClassify::new(Flaky::new(1, loading), 3, StdDuration::from_millis(1));
        let started = Instant::now();
        assert!(retry.classify("ok").await.unwrap().is_some());
        assert!(started.elapsed() >= StdDuration::from_millis(300));
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_estimated_wait_from_loading_body() {
        let body = r#"{"error":"Model distilbert is currently loading","estimated_time":20.5}"#;
        assert_eq!(estimated_wait(body), Some(StdDuration::from_secs_f64(20.5)));
        assert_eq!(estimated_wait(r#"{"error":"Unauthorized"}"#), None);
        assert_eq!(estimated_wait("Bad Gateway"), None);
    }

    #[tokio::test]
    async fn test_http_classifier_skips_blank_input_without_request() {
        let settings = NeuralSettings {
            endpoint: "http://127.0.0.1:9/unused".into(),
            ..NeuralSettings::default()
        };
        let classifier = HttpClassifier::new(&settings).unwrap();
        assert!(classifier.classify("   ").await.unwrap().is_none());
    }
}
