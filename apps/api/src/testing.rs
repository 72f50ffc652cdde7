//! In-memory collaborators for pipeline and router tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::PipelineError;
use crate::models::evaluation::{EvaluationRecord, ResumeDocument};
use crate::ranking::narrative::NarrativeService;
use crate::ranking::pipeline::{PipelineOptions, RankingPipeline};
use crate::ranking::text_extractor::sample_pdf;
use crate::storage::{RecordSink, UploadStore};

/// Replies with a canned text, or fails when `reply` is `None`.
#[derive(Default)]
pub struct FakeNarrative {
    pub reply: Option<String>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeNarrative {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarrativeService for FakeNarrative {
    async fn evaluate(&self, prompt: &str) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply
            .clone()
            .ok_or_else(|| PipelineError::NarrativeService("connection refused".to_string()))
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub fail: bool,
    pub records: Mutex<Vec<EvaluationRecord>>,
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn insert(&self, record: &EvaluationRecord) -> Result<(), PipelineError> {
        if self.fail {
            return Err(PipelineError::StorageWrite("database unavailable".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUploads {
    pub fail: bool,
    pub delay: Option<Duration>,
    pub saved: Mutex<Vec<String>>,
}

#[async_trait]
impl UploadStore for MemoryUploads {
    async fn save(&self, filename: &str, _content: &Bytes) -> Result<(), PipelineError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(PipelineError::StorageWrite("disk full".to_string()));
        }
        self.saved.lock().unwrap().push(filename.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub narrative: Arc<FakeNarrative>,
    pub sink: Arc<MemorySink>,
    pub uploads: Arc<MemoryUploads>,
    pub pipeline: RankingPipeline,
}

pub fn harness(narrative: FakeNarrative, sink: MemorySink, max_concurrency: usize) -> Harness {
    harness_with_uploads(narrative, sink, MemoryUploads::default(), max_concurrency)
}

pub fn harness_with_uploads(
    narrative: FakeNarrative,
    sink: MemorySink,
    uploads: MemoryUploads,
    max_concurrency: usize,
) -> Harness {
    let narrative = Arc::new(narrative);
    let sink = Arc::new(sink);
    let uploads = Arc::new(uploads);
    let pipeline = RankingPipeline::new(
        narrative.clone(),
        sink.clone(),
        uploads.clone(),
        PipelineOptions { max_concurrency },
    );
    Harness {
        narrative,
        sink,
        uploads,
        pipeline,
    }
}

pub fn pdf_doc(filename: &str, text: &str) -> ResumeDocument {
    ResumeDocument {
        filename: filename.to_string(),
        content: Bytes::from(sample_pdf(&[text])),
    }
}
