//! Narrative Evaluator — asks the LLM for a qualitative assessment of one resume.
//!
//! The reply is treated as opaque text. The summary is its first two lines
//! joined with a space. The JSON shape the prompt asks for is parsed on a
//! best-effort basis into a `StructuredAssessment`; it is informational only
//! and never feeds into ranking.

use async_trait::async_trait;
use tracing::debug;

use crate::errors::PipelineError;
use crate::llm_client::{strip_json_fences, LlmClient};
use crate::models::evaluation::StructuredAssessment;
use crate::ranking::prompts::{EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM};

/// The LLM capability the pipeline depends on: prompt in, free-form text out.
///
/// Carried in `RankingPipeline` as `Arc<dyn NarrativeService>` so tests can
/// swap in a fake.
#[async_trait]
pub trait NarrativeService: Send + Sync {
    async fn evaluate(&self, prompt: &str) -> Result<String, PipelineError>;
}

/// Production backend: the Anthropic client with retry and timeout.
pub struct LlmNarrativeService(pub LlmClient);

#[async_trait]
impl NarrativeService for LlmNarrativeService {
    async fn evaluate(&self, prompt: &str) -> Result<String, PipelineError> {
        self.0
            .call_text(prompt, EVALUATION_SYSTEM)
            .await
            .map_err(|e| PipelineError::NarrativeService(e.to_string()))
    }
}

/// Post-processed LLM reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Narrative {
    pub summary: String,
    pub assessment: Option<StructuredAssessment>,
}

/// Builds the evaluation prompt with both texts embedded verbatim.
pub fn build_prompt(resume_text: &str, jd_text: &str) -> String {
    // JD first: a resume containing the literal "{jd_text}" must not be expanded.
    EVALUATION_PROMPT_TEMPLATE
        .replace("{jd_text}", jd_text)
        .replacen("{resume_text}", resume_text, 1)
}

/// Runs one evaluation round-trip and post-processes the reply.
pub async fn evaluate_resume(
    service: &dyn NarrativeService,
    resume_text: &str,
    jd_text: &str,
) -> Result<Narrative, PipelineError> {
    let prompt = build_prompt(resume_text, jd_text);
    let reply = service.evaluate(&prompt).await?;
    Ok(Narrative {
        summary: summarize_reply(&reply),
        assessment: parse_assessment(&reply),
    })
}

/// First two lines of the reply joined by a single space.
pub fn summarize_reply(reply: &str) -> String {
    reply.split('\n').take(2).collect::<Vec<_>>().join(" ")
}

/// Parses the `{"JD Match", "MissingKeywords", "Profile Summary"}` object out of
/// the reply, tolerating code fences and surrounding prose.
pub fn parse_assessment(reply: &str) -> Option<StructuredAssessment> {
    let text = strip_json_fences(reply);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<StructuredAssessment>(&text[start..=end]) {
        Ok(assessment) if assessment != StructuredAssessment::default() => Some(assessment),
        Ok(_) => None,
        Err(e) => {
            debug!("LLM reply is not the requested JSON shape: {e}");
            None
        }
    }
}
