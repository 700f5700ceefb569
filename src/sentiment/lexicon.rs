//! Lexicon-based polarity scoring in the style of TextBlob's pattern analyzer.
//!
//! Every known word carries a `(polarity, subjectivity, intensity)` triple.
//! Scoring a sentence walks its tokens and builds a list of *assessments*:
//!
//! - A sentiment word (non-zero polarity or subjectivity) becomes an assessment.
//! - A pure intensifier (polarity `0`, intensity `!= 1`) right before a
//!   sentiment word multiplies that word's polarity and subjectivity.
//! - A negator (`not`, `never`, `...n't`) within three tokens before a
//!   sentiment word multiplies its polarity by `-0.5`.
//! - Each `!` directly after a sentiment word multiplies its polarity by `1.25`.
//!
//! Polarity is the mean of the assessments clamped to `[-1, 1]`, subjectivity
//! the mean clamped to `[0, 1]`. A sentence with no assessments scores `(0, 0)`.

use super::{unavailable, SentimentBackend};
use crate::error::PipelineError;
use crate::models::SentimentResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument};

const NEGATION_FACTOR: f64 = -0.5;
const EXCLAMATION_FACTOR: f64 = 1.25;
const NEGATION_WINDOW: usize = 3;

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[:;=][-o^']?[()\[\]dp/\\|*]|[a-z]+(?:['’][a-z]+)*|!")
        .expect("token pattern must compile")
});

/// `(word, polarity, subjectivity, intensity)`
#[rustfmt::skip]
const BUILTIN: &[(&str, f64, f64, f64)] = &[
    // intensifiers and diminishers
    ("very", 0.0, 0.3, 1.3), ("really", 0.0, 0.2, 1.3), ("extremely", 0.0, 1.0, 1.5),
    ("highly", 0.0, 0.5, 1.4), ("incredibly", 0.0, 0.9, 1.5), ("quite", 0.0, 0.4, 1.1),
    ("truly", 0.0, 0.5, 1.3), ("deeply", 0.0, 0.6, 1.3), ("particularly", 0.0, 0.3, 1.2),
    ("especially", 0.0, 0.3, 1.2), ("fairly", 0.0, 0.6, 0.8), ("rather", 0.0, 0.3, 0.8),
    ("somewhat", 0.0, 0.3, 0.7), ("slightly", 0.0, 0.4, 0.6), ("barely", 0.0, 0.6, 0.5),
    // positive
    ("good", 0.7, 0.6, 1.0), ("great", 0.8, 0.75, 1.0), ("excellent", 1.0, 1.0, 1.0),
    ("wonderful", 1.0, 1.0, 1.0), ("amazing", 0.6, 0.9, 1.0), ("fantastic", 0.4, 0.9, 1.0),
    ("best", 1.0, 0.3, 1.0), ("better", 0.5, 0.5, 1.0), ("nice", 0.6, 1.0, 1.0),
    ("happy", 0.8, 1.0, 1.0), ("glad", 0.5, 1.0, 1.0), ("pleased", 0.5, 1.0, 1.0),
    ("positive", 0.23, 0.55, 1.0), ("successful", 0.75, 0.95, 1.0), ("success", 0.3, 0.0, 1.0),
    ("strong", 0.43, 0.73, 1.0), ("stable", 0.2, 0.6, 1.0), ("safe", 0.5, 0.5, 1.0),
    ("peaceful", 0.25, 0.6, 1.0), ("hopeful", 0.5, 0.8, 1.0), ("encouraging", 0.5, 0.7, 1.0),
    ("important", 0.4, 1.0, 1.0), ("significant", 0.38, 0.88, 1.0), ("major", 0.06, 0.5, 1.0),
    ("new", 0.14, 0.45, 1.0), ("free", 0.4, 0.8, 1.0), ("fair", 0.7, 0.9, 1.0),
    ("beautiful", 0.85, 1.0, 1.0), ("love", 0.5, 0.6, 1.0), ("lovely", 0.5, 0.75, 1.0),
    ("brilliant", 0.9, 1.0, 1.0), ("perfect", 1.0, 1.0, 1.0), ("impressive", 1.0, 1.0, 1.0),
    ("remarkable", 0.75, 0.75, 1.0), ("popular", 0.6, 0.8, 1.0), ("generous", 0.5, 0.5, 1.0),
    ("kind", 0.6, 0.9, 1.0), ("helpful", 0.6, 0.6, 1.0), ("effective", 0.6, 0.8, 1.0),
    ("welcome", 0.8, 0.9, 1.0), ("secure", 0.4, 0.6, 1.0), ("healthy", 0.5, 0.5, 1.0),
    ("proud", 0.8, 1.0, 1.0), ("easy", 0.43, 0.83, 1.0),
    ("clear", 0.1, 0.38, 1.0), ("calm", 0.3, 0.75, 1.0), ("rich", 0.38, 0.75, 1.0),
    ("large", 0.21, 0.43, 1.0), ("huge", 0.4, 0.9, 1.0), ("fine", 0.42, 0.5, 1.0),
    ("true", 0.35, 0.65, 1.0), ("right", 0.29, 0.54, 1.0), ("able", 0.5, 0.62, 1.0),
    ("confident", 0.5, 0.83, 1.0), ("optimistic", 0.5, 0.6, 1.0), ("promising", 0.4, 0.6, 1.0),
    // negative
    ("bad", -0.7, 0.67, 1.0), ("worse", -0.4, 0.6, 1.0), ("worst", -1.0, 1.0, 1.0),
    ("terrible", -1.0, 1.0, 1.0), ("awful", -1.0, 1.0, 1.0), ("horrible", -1.0, 1.0, 1.0),
    ("poor", -0.4, 0.6, 1.0), ("sad", -0.5, 1.0, 1.0), ("angry", -0.5, 1.0, 1.0),
    ("violent", -0.8, 0.9, 1.0), ("deadly", -0.2, 0.4, 1.0), ("dead", -0.2, 0.4, 1.0),
    ("dangerous", -0.6, 0.9, 1.0), ("serious", -0.33, 0.67, 1.0), ("severe", -0.2, 0.5, 1.0),
    ("difficult", -0.5, 1.0, 1.0), ("hard", -0.29, 0.54, 1.0), ("weak", -0.38, 0.63, 1.0),
    ("negative", -0.3, 0.4, 1.0), ("wrong", -0.5, 0.9, 1.0), ("false", -0.4, 0.6, 1.0),
    ("illegal", -0.5, 0.5, 1.0), ("corrupt", -0.5, 0.5, 1.0), ("brutal", -0.88, 0.88, 1.0),
    ("tragic", -0.75, 1.0, 1.0), ("cruel", -1.0, 1.0, 1.0), ("fearful", -0.6, 1.0, 1.0),
    ("afraid", -0.6, 0.9, 1.0), ("worried", -0.4, 0.7, 1.0), ("unstable", -0.3, 0.6, 1.0),
    ("hungry", -0.3, 0.6, 1.0), ("sick", -0.71, 0.86, 1.0), ("ill", -0.5, 0.8, 1.0),
    ("fatal", -0.6, 0.7, 1.0), ("devastating", -0.8, 0.9, 1.0), ("destructive", -0.6, 0.8, 1.0),
    ("desperate", -0.6, 0.9, 1.0), ("grim", -0.5, 0.8, 1.0), ("disappointing", -0.6, 0.7, 1.0),
    ("unfair", -0.5, 0.9, 1.0), ("hostile", -0.5, 0.7, 1.0), ("crude", -0.3, 0.6, 1.0),
    ("critical", -0.1, 0.6, 1.0), ("displaced", -0.1, 0.3, 1.0), ("armed", -0.1, 0.3, 1.0),
    ("insecure", -0.4, 0.6, 1.0), ("scary", -0.5, 1.0, 1.0), ("stupid", -0.8, 1.0, 1.0),
    ("ugly", -0.7, 1.0, 1.0), ("hate", -0.8, 0.9, 1.0), ("little", -0.19, 0.5, 1.0),
    ("small", -0.25, 0.4, 1.0), ("old", 0.1, 0.2, 1.0), ("late", -0.3, 0.6, 1.0),
    ("low", 0.0, 0.3, 1.0), ("high", 0.16, 0.54, 1.0), ("long", -0.05, 0.4, 1.0),
    // emoticons
    (":)", 0.5, 1.0, 1.0), (":-)", 0.5, 1.0, 1.0), (";)", 0.5, 1.0, 1.0), (":d", 0.8, 1.0, 1.0),
    (":p", 0.3, 1.0, 1.0), (":(", -0.75, 1.0, 1.0), (":-(", -0.75, 1.0, 1.0), (":/", -0.3, 1.0, 1.0),
];

const NEGATORS: &[&str] = &["not", "never", "no", "none", "nobody", "nothing", "neither", "nor", "cannot"];

/// One lexicon row.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LexiconEntry {
    pub polarity: f64,
    pub subjectivity: f64,
    #[serde(default = "unit_intensity")]
    pub intensity: f64,
}

fn unit_intensity() -> f64 {
    1.0
}

impl LexiconEntry {
    fn is_intensifier(&self) -> bool {
        self.polarity == 0.0 && self.intensity != 1.0
    }
}

/// Polarity and subjectivity of one piece of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexiconSentiment {
    pub polarity: f64,
    pub subjectivity: f64,
}

#[derive(Debug, Clone, Copy)]
struct Assessment {
    polarity: f64,
    subjectivity: f64,
}

/// The word table plus the scoring rules.
#[derive(Debug, Clone)]
pub struct LexiconBackend {
    entries: HashMap<String, LexiconEntry>,
}

impl Default for LexiconBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconBackend {
    /// Backend with the built-in English table.
    pub fn new() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|&(word, polarity, subjectivity, intensity)| {
                (
                    word.to_string(),
                    LexiconEntry {
                        polarity,
                        subjectivity,
                        intensity,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Built-in table overlaid with entries from a YAML map of
    /// `word: {polarity, subjectivity, intensity?}`.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn with_extensions(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| unavailable("lexicon", e))?;
        let extra: HashMap<String, LexiconEntry> =
            serde_yaml::from_str(&raw).map_err(|e| unavailable("lexicon", e))?;

        let mut backend = Self::new();
        for (word, entry) in extra {
            if !(-1.0..=1.0).contains(&entry.polarity)
                || !(0.0..=1.0).contains(&entry.subjectivity)
                || !entry.intensity.is_finite()
                || entry.intensity <= 0.0
            {
                return Err(unavailable(
                    "lexicon",
                    format!("entry `{word}` is out of range"),
                ));
            }
            backend.entries.insert(word.to_lowercase(), entry);
        }
        info!(entries = backend.entries.len(), "Loaded lexicon extensions");
        Ok(backend)
    }

    pub fn lexicon_len(&self) -> usize {
        self.entries.len()
    }

    /// Polarity and subjectivity of `text`.
    pub fn analyze(&self, text: &str) -> LexiconSentiment {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN.find_iter(&lowered).map(|m| m.as_str()).collect();

        let mut assessments: Vec<Assessment> = Vec::new();
        let mut pending_intensity: Option<f64> = None;
        let mut negation_left = 0usize;
        let mut after_assessment = false;

        for token in tokens {
            if token == "!" {
                if after_assessment {
                    if let Some(last) = assessments.last_mut() {
                        last.polarity = (last.polarity * EXCLAMATION_FACTOR).clamp(-1.0, 1.0);
                    }
                }
                continue;
            }

            if is_negator(token) {
                negation_left = NEGATION_WINDOW;
                pending_intensity = None;
                after_assessment = false;
                continue;
            }

            match self.entries.get(token) {
                Some(entry) if entry.is_intensifier() => {
                    pending_intensity = Some(entry.intensity);
                    after_assessment = false;
                }
                Some(entry) => {
                    let factor = pending_intensity.take().unwrap_or(1.0);
                    let mut polarity = entry.polarity * factor;
                    if negation_left > 0 {
                        polarity *= NEGATION_FACTOR;
                        negation_left = 0;
                    }
                    assessments.push(Assessment {
                        polarity: polarity.clamp(-1.0, 1.0),
                        subjectivity: (entry.subjectivity * factor).clamp(0.0, 1.0),
                    });
                    after_assessment = true;
                    continue;
                }
                None => {
                    pending_intensity = None;
                    after_assessment = false;
                }
            }
            negation_left = negation_left.saturating_sub(1);
        }

        if assessments.is_empty() {
            return LexiconSentiment {
                polarity: 0.0,
                subjectivity: 0.0,
            };
        }
        let n = assessments.len() as f64;
        let polarity = assessments.iter().map(|a| a.polarity).sum::<f64>() / n;
        let subjectivity = assessments.iter().map(|a| a.subjectivity).sum::<f64>() / n;
        LexiconSentiment {
            polarity: polarity.clamp(-1.0, 1.0),
            subjectivity: subjectivity.clamp(0.0, 1.0),
        }
    }
}

fn is_negator(token: &str) -> bool {
    NEGATORS.contains(&token) || token.ends_with("n't") || token.ends_with("n’t")
}

impl SentimentBackend for LexiconBackend {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    async fn score(&self, sentence: &str) -> Option<SentimentResult> {
        let sentiment = self.analyze(sentence);
        debug!(
            polarity = sentiment.polarity,
            subjectivity = sentiment.subjectivity,
            "Lexicon scored sentence"
        );
        Some(SentimentResult::polarity(sentiment.polarity))
    }
}
