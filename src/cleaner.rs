//! Text cleaning for scraped article bodies.
//!
//! Scraped paragraphs still carry markup remnants and a handful of escaped
//! entities. [`clean`] applies a fixed list of substitutions, in order, and
//! nothing else: no case folding, no trimming, no whitespace collapsing.
//! Repeated spaces introduced by the substitutions are kept as-is.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

/// Ordered substitution table. Later rules never see the placeholder text
/// produced by earlier ones as something to rewrite.
static RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        // Inline hyperlinks collapse to a placeholder sentence.
        (r"<a[^>]*>(.+?)</a>", "Link."),
        ("&gt;", ""),
        ("&#x27;", "'"),
        ("&quot;", "\""),
        ("&#x2F;", " "),
        ("<p>", " "),
        ("</i>", ""),
        ("&#62;", ""),
        ("<i>", " "),
        ("\n", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("cleaning rule must be a valid regex"),
            replacement,
        )
    })
    .collect()
});

/// Normalise raw scraped text into plain prose.
///
/// Pure and deterministic. Empty input yields empty output, and text that
/// matches none of the rules comes back unchanged.
pub fn clean(raw: &str) -> String {
    let mut text = raw.to_string();
    for (pattern, replacement) in RULES.iter() {
        if pattern.is_match(&text) {
            text = pattern.replace_all(&text, NoExpand(replacement)).into_owned();
        }
    }
    text
}
