// Resume ranking: text extraction, identity, keyword score, LLM narrative, rank order.
// All LLM calls go through llm_client via the NarrativeService seam.

pub mod aggregator;
pub mod handlers;
pub mod identity;
pub mod keyword_scorer;
pub mod narrative;
pub mod pipeline;
pub mod prompts;
pub mod text_extractor;
