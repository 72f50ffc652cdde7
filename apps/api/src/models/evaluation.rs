use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_NAME: &str = "Unknown";
pub const NO_EMAIL: &str = "No Email Found";

/// One uploaded resume. Lives only for the batch that received it.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub filename: String,
    pub content: Bytes,
}

/// Best-effort candidate identity recovered from resume text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CandidateIdentity {
    fn default() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            email: NO_EMAIL.to_string(),
        }
    }
}

/// The structured reply the evaluation prompt asks for.
/// Models do not always comply, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredAssessment {
    #[serde(rename = "JD Match", default)]
    pub jd_match: Option<String>,
    #[serde(rename = "MissingKeywords", default)]
    pub missing_keywords: Vec<String>,
    #[serde(rename = "Profile Summary", default)]
    pub profile_summary: Option<String>,
}

/// Everything the pipeline learned about one resume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub candidate_name: String,
    pub candidate_email: String,
    pub match_percentage: f64,
    pub description: String,
    pub source_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<StructuredAssessment>,
}

/// An evaluation with its position in the batch ordering (1 = best).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub rank: u32,
    #[serde(flatten)]
    pub record: EvaluationRecord,
}

/// Output table row shown to the submitting user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub rank: u32,
    pub candidate_name: String,
    pub candidate_email: String,
    pub match_percentage: f64,
    pub summary: String,
}

impl From<&RankedResult> for RankingRow {
    fn from(result: &RankedResult) -> Self {
        Self {
            rank: result.rank,
            candidate_name: result.record.candidate_name.clone(),
            candidate_email: result.record.candidate_email.clone(),
            match_percentage: (result.record.match_percentage * 100.0).round() / 100.0,
            summary: result.record.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    DocumentParse,
    EmptyDocument,
    NarrativeService,
    StorageWrite,
    Cancelled,
}

/// A resume that was skipped or only partially evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemWarning {
    pub filename: String,
    pub kind: WarningKind,
    pub message: String,
}

impl ItemWarning {
    pub fn new(filename: &str, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            kind,
            message: message.into(),
        }
    }
}

/// Result of one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<RankedResult>,
    pub warnings: Vec<ItemWarning>,
    pub cancelled: bool,
}
