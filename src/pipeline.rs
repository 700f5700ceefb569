//! The article sentiment pipeline.
//!
//! For every article, in input order:
//!
//! 1. **Clean**: strip markup remnants and decode entities ([`crate::cleaner`])
//! 2. **Segment**: split into sentences ([`crate::segmenter`])
//! 3. **Score**: ask the backend about each sentence ([`crate::sentiment`])
//! 4. **Aggregate**: mean of the sentence scores ([`aggregate`])
//!
//! Per-article failures (no scorable sentence, segmentation error) are
//! logged and the article is left out of the output series; its siblings
//! carry on. With `fail_fast` the first such failure aborts the batch instead.
//!
//! Articles are processed one at a time by default. A concurrency above one
//! scores several articles at once while still yielding results in input
//! order. A [`CancelToken`] is checked before each article starts.

use crate::cleaner::clean;
use crate::error::PipelineError;
use crate::models::{
    Article, ArticleFailure, CleanedArticle, RunReport, ScoredArticle, SegmentedArticle,
};
use crate::segmenter::SentenceSegmenter;
use crate::sentiment::SentimentBackend;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

/// Per-sentence scores of one article and their mean.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// Scores of the sentences the backend labelled, in sentence order.
    pub sentence_scores: Vec<f64>,
    /// Indices of sentences the backend declined to score.
    pub skipped: Vec<usize>,
    /// Arithmetic mean of `sentence_scores`.
    pub polarity: f64,
}

/// Score every sentence and average the results.
///
/// Sentences the backend skips count in neither the sum nor the divisor.
///
/// # Errors
///
/// [`PipelineError::EmptyAggregationInput`] when no sentence was scored,
/// either because there were none or because all of them were skipped.
pub async fn aggregate<B: SentimentBackend>(
    sentences: &[String],
    backend: &B,
) -> Result<Aggregate, PipelineError> {
    let mut sentence_scores = Vec::with_capacity(sentences.len());
    let mut skipped = Vec::new();

    for (index, sentence) in sentences.iter().enumerate() {
        match backend.score(sentence).await {
            Some(result) => sentence_scores.push(result.value),
            None => skipped.push(index),
        }
    }

    if sentence_scores.is_empty() {
        return Err(PipelineError::EmptyAggregationInput);
    }
    let polarity = sentence_scores.iter().sum::<f64>() / sentence_scores.len() as f64;
    Ok(Aggregate {
        sentence_scores,
        skipped,
        polarity,
    })
}

/// Shared flag used to stop a batch between articles.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Cancel on the first interrupt and call `abort` on the second.
    ///
    /// The first interrupt lets articles in flight finish; the second is the
    /// way out when one of them hangs (a classifier stuck in backoff).
    pub async fn watch_interrupts<S, A>(self, interrupts: S, abort: A)
    where
        S: Stream<Item = ()>,
        A: FnOnce(),
    {
        let mut interrupts = pin!(interrupts);
        if interrupts.next().await.is_none() {
            return;
        }
        warn!("Interrupt received; finishing articles in flight (interrupt again to quit)");
        self.cancel();
        if interrupts.next().await.is_some() {
            warn!("Second interrupt received; aborting");
            abort();
        }
    }
}

/// How a batch is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Number of articles in flight at once. `1` is strictly sequential.
    pub concurrency: usize,
    /// Abort the batch on the first per-article failure.
    pub fail_fast: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            fail_fast: false,
        }
    }
}

/// Drives a batch of articles through clean → segment → score → aggregate.
///
/// The backend is injected already loaded; the runner never constructs one.
pub struct PipelineRunner<'a, B> {
    backend: &'a B,
    segmenter: SentenceSegmenter,
    options: RunOptions,
    cancel: CancelToken,
}

impl<'a, B: SentimentBackend> PipelineRunner<'a, B> {
    pub fn new(backend: &'a B, segmenter: SentenceSegmenter, options: RunOptions) -> Self {
        Self {
            backend,
            segmenter,
            options: RunOptions {
                concurrency: options.concurrency.max(1),
                ..options
            },
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process the whole batch.
    ///
    /// The report lists scored articles and failures in input order. If the
    /// cancel token fires, the articles already started are finished and the
    /// report comes back flagged `cancelled`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ArticleFailed`] wrapping the first failure, in
    /// fail-fast mode or when the failure is not confined to one article.
    #[instrument(level = "info", skip_all, fields(backend = self.backend.name(), total = articles.len()))]
    pub async fn run(&self, articles: Vec<Article>) -> Result<RunReport, PipelineError> {
        let total = articles.len();
        let runner = self;
        let cancel = self.cancel.clone();

        let mut outcomes = stream::iter(articles)
            .take_while(move |_| future::ready(!cancel.is_cancelled()))
            .map(move |article| async move {
                let title = article.title.clone();
                let url = article.url.clone();
                let outcome = runner.process_article(article).await;
                (title, url, outcome)
            })
            .buffered(self.options.concurrency);

        let mut report = RunReport::default();
        let mut processed = 0usize;

        while let Some((title, url, outcome)) = outcomes.next().await {
            processed += 1;
            match outcome {
                Ok(scored) => {
                    info!(
                        processed,
                        total,
                        %title,
                        polarity = scored.polarity,
                        sentences = scored.sentences.len(),
                        scored = scored.sentence_scores.len(),
                        "Scored article"
                    );
                    report.scored.push(scored);
                }
                Err(e) if self.options.fail_fast || !e.is_per_article() => {
                    warn!(processed, total, %title, %url, reason = %e, "Article failed; aborting batch");
                    return Err(PipelineError::ArticleFailed {
                        title,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(processed, total, %title, %url, reason = %e, "Article excluded from results");
                    report.failures.push(ArticleFailure {
                        title,
                        url,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if processed < total {
            report.cancelled = true;
            warn!(processed, total, "Run cancelled before all articles were processed");
        }
        info!(
            scored = report.scored.len(),
            failed = report.failures.len(),
            "Pipeline finished"
        );
        Ok(report)
    }

    #[instrument(level = "debug", skip_all, fields(title = %article.title))]
    async fn process_article(&self, article: Article) -> Result<ScoredArticle, PipelineError> {
        let cleaned = clean_article(article);
        let segmented = self.segment_article(cleaned)?;
        score_article(segmented, self.backend).await
    }

    fn segment_article(&self, article: CleanedArticle) -> Result<SegmentedArticle, PipelineError> {
        let sentences = self.segmenter.segment(&article.cleaned_text)?;
        debug!(count = sentences.len(), "Segmented article");
        Ok(SegmentedArticle {
            url: article.url,
            title: article.title,
            cleaned_text: article.cleaned_text,
            sentences,
        })
    }
}

fn clean_article(article: Article) -> CleanedArticle {
    CleanedArticle {
        cleaned_text: clean(&article.raw_text),
        url: article.url,
        title: article.title,
    }
}

async fn score_article<B: SentimentBackend>(
    article: SegmentedArticle,
    backend: &B,
) -> Result<ScoredArticle, PipelineError> {
    let aggregate = aggregate(&article.sentences, backend).await?;
    Ok(ScoredArticle {
        title: article.title,
        url: article.url,
        polarity: aggregate.polarity,
        sentence_scores: aggregate.sentence_scores,
        sentences: article.sentences,
        skipped_sentences: aggregate.skipped,
        cleaned_text: article.cleaned_text,
    })
}
