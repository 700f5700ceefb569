//! Data models for articles as they move through the sentiment pipeline.
//!
//! Each stage consumes the record produced by the previous one and returns a
//! new, fully-populated record:
//!
//! ```text
//! Article ──clean──▶ CleanedArticle ──segment──▶ SegmentedArticle ──aggregate──▶ ScoredArticle
//! ```
//!
//! Nothing is mutated in place, so a stage can never observe a half-filled
//! article.

use serde::{Deserialize, Serialize};

/// A raw article as delivered by a document source.
///
/// Serialises to `{url, title, text}`, the shape written to `articles.json`
/// after fetching and read back by the cached source.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Article {
    /// The page the article was fetched from.
    pub url: String,
    /// The headline as shown on the section index.
    pub title: String,
    /// Body text exactly as scraped.
    #[serde(rename = "text")]
    pub raw_text: String,
}

impl Article {
    pub fn new(url: impl Into<String>, title: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// An article whose body has gone through the text cleaner.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedArticle {
    pub url: String,
    pub title: String,
    pub cleaned_text: String,
}

/// A cleaned article split into sentences in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedArticle {
    pub url: String,
    pub title: String,
    pub cleaned_text: String,
    pub sentences: Vec<String>,
}

/// A fully scored article.
///
/// `sentence_scores` holds one entry per sentence that the backend scored.
/// Sentences the backend declined to label are listed by index in
/// `skipped_sentences`, so `sentence_scores.len() + skipped_sentences.len()`
/// always equals `sentences.len()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredArticle {
    pub title: String,
    pub url: String,
    pub polarity: f64,
    pub sentence_scores: Vec<f64>,
    pub sentences: Vec<String>,
    pub skipped_sentences: Vec<usize>,
    #[serde(skip)]
    pub cleaned_text: String,
}

/// Categorical output of a binary sentiment classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Negative => "NEGATIVE",
        }
    }
}

/// The outcome of scoring one sentence.
///
/// `value` is always a signed polarity in `[-1, 1]`. Classifier-style
/// backends also report the label and confidence the value was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    pub value: f64,
    pub raw_label: Option<SentimentLabel>,
    pub confidence: Option<f64>,
}

impl SentimentResult {
    /// A plain polarity score with no categorical origin.
    pub fn polarity(value: f64) -> Self {
        Self {
            value: value.clamp(-1.0, 1.0),
            raw_label: None,
            confidence: None,
        }
    }

    /// Map a label and its confidence onto a signed scalar: positive
    /// confidence stays positive, negative confidence is negated.
    pub fn from_label(label: SentimentLabel, confidence: f64) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        let value = match label {
            SentimentLabel::Positive => confidence,
            SentimentLabel::Negative => -confidence,
        };
        Self {
            value,
            raw_label: Some(label),
            confidence: Some(confidence),
        }
    }
}

/// Why an article was left out of the output series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleFailure {
    pub title: String,
    pub url: String,
    pub reason: String,
}

/// Everything a pipeline run produced, in input order.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub scored: Vec<ScoredArticle>,
    pub failures: Vec<ArticleFailure>,
    pub cancelled: bool,
}

impl RunReport {
    /// The `(title, polarity)` series consumed by the chart, in input order.
    pub fn series(&self) -> Vec<(String, f64)> {
        self.scored
            .iter()
            .map(|a| (a.title.clone(), a.polarity))
            .collect()
    }
}
