//! Lexical overlap between JD keywords and resume text.
//!
//! Algorithm:
//! 1. Lower-case the JD and take every maximal `\w+` run as a keyword.
//!    Duplicates are kept, so a term repeated in the JD weighs more.
//! 2. A keyword matches if it occurs anywhere in the lower-cased resume text
//!    (plain substring, no word boundaries).
//! 3. score = matches / keywords × 100, or 0 when there are no keywords.

use std::sync::OnceLock;

use regex::Regex;

fn word_regex() -> &'static Regex {
    static WORD_RE: OnceLock<Regex> = OnceLock::new();
    WORD_RE.get_or_init(|| Regex::new(r"\w+").expect("word regex compiles"))
}

/// Tokenizes a job description into case-folded keywords, in order, duplicates kept.
pub fn tokenize_keywords(jd_text: &str) -> Vec<String> {
    let lowered = jd_text.to_lowercase();
    word_regex()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Percentage of keywords present in `resume_text`, in `[0, 100]`.
pub fn match_percentage(keywords: &[String], resume_text: &str) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let haystack = resume_text.to_lowercase();
    let matches = keywords
        .iter()
        .filter(|keyword| haystack.contains(keyword.to_lowercase().as_str()))
        .count();
    matches as f64 / keywords.len() as f64 * 100.0
}
