//! Rule-based sentence boundary detection for English news prose.
//!
//! A boundary falls after a run of terminal punctuation (`.`, `!`, `?`),
//! including any closing quotes or brackets that follow it, when the next
//! non-space character opens a new sentence: an uppercase letter, a digit or
//! an opening quote/bracket. A lone `.` after a known abbreviation, a dotted
//! acronym or a name initial does not end a sentence. A single capital counts
//! as an initial only inside a name: followed by another initial, or preceded
//! by a capitalised word or the start of the sentence. `I` never does, so
//! "World War I. Then" splits.
//!
//! Markup that survived cleaning is not prose. Tags are read as whitespace,
//! and block-closing tags (`</p>`, `<br>`, ...) always end the current
//! sentence.

use crate::error::PipelineError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Longest input accepted, in characters.
pub const DEFAULT_MAX_LENGTH: usize = 1_000_000;

static BLOCK_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</(?:p|div|li|h[1-6]|blockquote|figcaption)\s*>|<br\s*/?>")
        .expect("block break pattern must compile")
});

static RESIDUAL_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").expect("tag pattern must compile"));

static DOTTED_ACRONYM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-Za-z]\.)+[A-Za-z]$").expect("acronym pattern must compile"));

static ABBREVIATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "gen", "col", "lt", "sgt",
        "capt", "cmdr", "gov", "sen", "rep", "rev", "pres", "vs", "inc", "ltd", "co", "corp",
        "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
        "fig", "approx", "dept", "est", "mln", "bn", "e.g", "i.e", "cf", "al",
    ]
    .into_iter()
    .collect()
});

/// Splits cleaned text into sentences in reading order.
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    max_length: usize,
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LENGTH)
    }
}

impl SentenceSegmenter {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Segment `text` into trimmed, non-empty sentences.
    ///
    /// The same input always yields the same output.
    ///
    /// # Errors
    ///
    /// [`PipelineError::SegmentationFailure`] when the text exceeds the
    /// configured maximum length.
    #[instrument(level = "debug", skip_all, fields(chars = tracing::field::Empty))]
    pub fn segment(&self, text: &str) -> Result<Vec<String>, PipelineError> {
        let chars = text.chars().count();
        tracing::Span::current().record("chars", chars);
        if chars > self.max_length {
            return Err(PipelineError::SegmentationFailure(format!(
                "text of {chars} characters exceeds the maximum of {}",
                self.max_length
            )));
        }

        let mut sentences = Vec::new();
        for block in BLOCK_BREAK.split(text) {
            let block = RESIDUAL_TAG.replace_all(block, " ");
            split_block(&block, &mut sentences);
        }
        debug!(count = sentences.len(), "Segmented text");
        Ok(sentences)
    }
}

fn split_block(block: &str, out: &mut Vec<String>) {
    let chars: Vec<(usize, char)> = block.char_indices().collect();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        if !is_terminal(chars[i].1) {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        while j < chars.len() && is_terminal(chars[j].1) {
            j += 1;
        }
        while j < chars.len() && is_closer(chars[j].1) {
            j += 1;
        }
        if ends_sentence(block, &chars, i, j) {
            let end = chars[j].0;
            push_sentence(&block[start..end], out);
            start = end;
        }
        i = j;
    }
    push_sentence(&block[start..], out);
}

/// Decide whether the terminal run `chars[run_start..run_end]` closes a sentence.
fn ends_sentence(block: &str, chars: &[(usize, char)], run_start: usize, run_end: usize) -> bool {
    if run_end >= chars.len() || !chars[run_end].1.is_whitespace() {
        return false;
    }
    let next = chars[run_end..].iter().map(|&(_, c)| c).find(|c| !c.is_whitespace());
    match next {
        Some(c) if c.is_uppercase() || c.is_ascii_digit() || is_opener(c) => {}
        _ => return false,
    }

    let single_period = chars[run_start].1 == '.'
        && (run_start + 1 == chars.len() || !is_terminal(chars[run_start + 1].1));
    if single_period {
        let word_start = block[..chars[run_start].0]
            .rfind(char::is_whitespace)
            .map(|p| p + 1)
            .unwrap_or(0);
        let word = block[word_start..chars[run_start].0].trim_start_matches(is_opener);
        if is_abbreviation(word) {
            return false;
        }
        let previous = block[..word_start].split_whitespace().next_back();
        let following = block[chars[run_end].0..].split_whitespace().next();
        if is_name_initial(word, previous, following) {
            return false;
        }
    }
    true
}

fn is_abbreviation(word: &str) -> bool {
    !word.is_empty()
        && (ABBREVIATIONS.contains(word.to_lowercase().as_str()) || DOTTED_ACRONYM.is_match(word))
}

/// `word` is a lone capital standing for a name, as in "J. R. Tolkien" or
/// "John F. Kennedy".
fn is_name_initial(word: &str, previous: Option<&str>, following: Option<&str>) -> bool {
    let mut letters = word.chars();
    match (letters.next(), letters.next()) {
        (Some(c), None) if c.is_uppercase() && c != 'I' => {}
        _ => return false,
    }

    let next_is_initial = following.is_some_and(|w| {
        let mut cs = w.chars();
        matches!((cs.next(), cs.next(), cs.next()), (Some(c), Some('.'), None) if c.is_uppercase())
    });
    let after_name_or_start = previous.is_none_or(|prev| {
        let prev = prev.trim_start_matches(is_opener);
        prev.starts_with(char::is_uppercase) || prev.ends_with(is_terminal)
    });
    next_is_initial || after_name_or_start
}

fn push_sentence(segment: &str, out: &mut Vec<String>) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | '”' | '’' | ')' | ']' | '»')
}

fn is_opener(c: char) -> bool {
    matches!(c, '"' | '\'' | '“' | '‘' | '(' | '[' | '«')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Vec<String> {
        SentenceSegmenter::default().segment(text).unwrap()
    }

    #[test]
    fn test_basic_split() {
        assert_eq!(
            segment("The storm passed. Residents returned home! Was it safe?"),
            vec!["The storm passed.", "Residents returned home!", "Was it safe?"]
        );
    }

    #[test]
    fn test_closing_paragraph_forces_boundary() {
        assert_eq!(
            segment(" Great news!</p> It helps everyone."),
            vec!["Great news!", "It helps everyone."]
        );
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        assert!(segment("   \t  ").is_empty());
        assert!(segment("").is_empty());
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        assert_eq!(
            segment("Mr. Nyusi met Dr. Banda in the U.S. capital. Talks ended."),
            vec!["Mr. Nyusi met Dr. Banda in the U.S. capital.", "Talks ended."]
        );
    }

    #[test]
    fn test_initials_do_not_split() {
        assert_eq!(
            segment("Author J. R. Tolkien wrote it. Fans agree."),
            vec!["Author J. R. Tolkien wrote it.", "Fans agree."]
        );
    }

    #[test]
    fn test_middle_and_leading_initials_do_not_split() {
        assert_eq!(
            segment("John F. Kennedy spoke. J. Smith replied. Crowds cheered."),
            vec!["John F. Kennedy spoke.", "J. Smith replied.", "Crowds cheered."]
        );
    }

    #[test]
    fn test_single_letters_ending_sentences_split() {
        assert_eq!(
            segment("It ended World War I. Then peace came. He got an A. She got a B."),
            vec!["It ended World War I.", "Then peace came.", "He got an A.", "She got a B."]
        );
    }

    #[test]
    fn test_lowercase_continuation_does_not_split() {
        assert_eq!(segment("Prices rose by approx. five percent."), vec![
            "Prices rose by approx. five percent."
        ]);
        assert_eq!(segment("It ended... and then it began."), vec![
            "It ended... and then it began."
        ]);
    }

    #[test]
    fn test_decimals_and_quotes() {
        assert_eq!(
            segment("Growth hit 3.5 percent. \"We are pleased,\" he said. \"Very.\" Then silence."),
            vec![
                "Growth hit 3.5 percent.",
                "\"We are pleased,\" he said.",
                "\"Very.\"",
                "Then silence."
            ]
        );
    }

    #[test]
    fn test_punctuation_runs() {
        assert_eq!(segment("What?! No way."), vec!["What?!", "No way."]);
    }

    #[test]
    fn test_inline_tags_read_as_whitespace() {
        assert_eq!(
            segment("A <b>bold</b> move. Another <span class=\"x\">one</span>."),
            vec!["A  bold  move.", "Another  one ."]
        );
    }

    #[test]
    fn test_deterministic() {
        let text = "One thing. Two things. Three things.";
        assert_eq!(segment(text), segment(text));
    }

    #[test]
    fn test_too_long_input_fails() {
        let segmenter = SentenceSegmenter::new(10);
        let err = segmenter.segment("This is far too long.").unwrap_err();
        assert!(matches!(err, PipelineError::SegmentationFailure(_)));
    }
}
