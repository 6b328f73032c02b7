//! Text normalization for OCR'd and PDF-extracted Statement of Facts text.
//!
//! Collapses layout whitespace and folds the many spellings of dates into
//! one form so the timeline patterns only need to know a single month
//! vocabulary. Applied before timeline extraction; field rules run against
//! the line-preserving text instead.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("valid regex")
}

/// Ordered `(pattern, replacement)` pairs. Order matters: misspellings are
/// fixed before month names are folded.
static REPLACEMENTS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (ci(r"\s+"), " "),
        // time markers: "@ 0700", "$0700", "at 0700"
        (ci(r"@|\$|\bat\b"), " "),
        (ci(r"\b(?:novmber|novemebr)\b"), "NOVEMBER"),
        (ci(r"\b(?:january|jan)\b"), "JAN"),
        (ci(r"\b(?:february|feb)\b"), "FEB"),
        (ci(r"\b(?:march|mar)\b"), "MAR"),
        (ci(r"\b(?:april|apr)\b"), "APR"),
        (ci(r"\bmay\b"), "MAY"),
        (ci(r"\b(?:june|jun)\b"), "JUN"),
        (ci(r"\b(?:july|jul)\b"), "JUL"),
        (ci(r"\b(?:august|aug)\b"), "AUG"),
        (ci(r"\b(?:september|sept|sep)\b"), "SEP"),
        (ci(r"\b(?:october|oct)\b"), "OCT"),
        (ci(r"\b(?:november|nov)\b"), "NOV"),
        (ci(r"\b(?:december|dec)\b"), "DEC"),
        // stray ordinal suffixes split off by OCR ("5 th")
        (ci(r"\b(?:st|nd|rd|th)\b"), ""),
    ]
});

static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));

/// Normalizes document text for timeline extraction.
///
/// The pipeline:
/// 1. Collapse all whitespace (including newlines) to single spaces
/// 2. Blank out `@`, `$` and the word `at`
/// 3. Fix common month misspellings
/// 4. Fold month names to upper-case three-letter abbreviations
/// 5. Drop stand-alone ordinal suffixes
/// 6. Collapse spaces and trim
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let mut out = text.to_owned();
    for (pattern, replacement) in REPLACEMENTS.iter() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    MULTI_SPACE_RE.replace_all(&out, " ").trim().to_owned()
}
