//! Runs one batch of resumes against one job description.
//!
//! Flow per resume: extract text → identity → narrative → keyword score →
//! record → save raw upload → insert record. Records then go through the
//! aggregator in upload order.
//!
//! Per-resume failures become `ItemWarning`s; only an empty batch is an error.
//! Cancellation only interrupts evaluation. Once a record exists, its upload
//! and insert run to completion and the record is ranked.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::{AppError, PipelineError};
use crate::llm_client::LlmClient;
use crate::models::evaluation::{
    BatchOutcome, EvaluationRecord, ItemWarning, ResumeDocument, WarningKind,
};
use crate::ranking::aggregator::rank_records;
use crate::ranking::identity::extract_identity;
use crate::ranking::keyword_scorer::{match_percentage, tokenize_keywords};
use crate::ranking::narrative::{evaluate_resume, LlmNarrativeService, Narrative, NarrativeService};
use crate::ranking::text_extractor::extract_text;
use crate::storage::{
    ensure_schema, LocalUploadStore, PgRecordSink, RecordSink, S3UploadStore, UploadStore,
};

/// One submission: a job description and the resumes to rank against it.
#[derive(Debug, Clone, Default)]
pub struct ResumeBatch {
    pub job_description: String,
    pub documents: Vec<ResumeDocument>,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Resumes evaluated at once. 1 keeps the strictly sequential behaviour.
    pub max_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { max_concurrency: 1 }
    }
}

/// Batch-wide cancellation, fired by sending `true` on the paired sender.
#[derive(Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    pub fn new() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self(rx))
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = Self::new();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation fires; pends forever if the sender is gone first.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

enum Evaluation {
    Scored {
        record: EvaluationRecord,
        warnings: Vec<ItemWarning>,
    },
    Skipped(ItemWarning),
}

/// What happened to a single resume.
struct ResumeOutcome {
    record: Option<EvaluationRecord>,
    warnings: Vec<ItemWarning>,
    cancelled: bool,
}

impl ResumeOutcome {
    fn skipped(warning: ItemWarning) -> Self {
        Self {
            record: None,
            warnings: vec![warning],
            cancelled: false,
        }
    }

    fn cancelled(filename: &str) -> Self {
        Self {
            record: None,
            warnings: vec![ItemWarning::new(
                filename,
                WarningKind::Cancelled,
                "Batch was cancelled before this resume finished",
            )],
            cancelled: true,
        }
    }
}

pub struct RankingPipeline {
    narrative: Arc<dyn NarrativeService>,
    sink: Arc<dyn RecordSink>,
    uploads: Arc<dyn UploadStore>,
    options: PipelineOptions,
}

impl RankingPipeline {
    pub fn new(
        narrative: Arc<dyn NarrativeService>,
        sink: Arc<dyn RecordSink>,
        uploads: Arc<dyn UploadStore>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            narrative,
            sink,
            uploads,
            options,
        }
    }

    /// Builds the production pipeline: Claude, PostgreSQL, and local disk or S3.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut llm = LlmClient::new(config.api_key.clone(), config.llm_timeout())?;
        if let Some(base_url) = &config.llm_base_url {
            llm = llm.with_base_url(base_url.clone());
        }
        info!("LLM client initialized (model: {})", crate::llm_client::MODEL);

        let pool = crate::db::create_pool(&config.storage_uri).await?;
        ensure_schema(&pool).await?;

        let uploads: Arc<dyn UploadStore> = match &config.s3 {
            Some(s3) => Arc::new(S3UploadStore::connect(s3).await),
            None => Arc::new(LocalUploadStore::open(&config.save_directory).await?),
        };

        Ok(Self::new(
            Arc::new(LlmNarrativeService(llm)),
            Arc::new(PgRecordSink::new(pool)),
            uploads,
            PipelineOptions {
                max_concurrency: config.max_concurrency,
            },
        ))
    }

    /// Evaluates and ranks every resume in the batch.
    pub async fn run(
        &self,
        batch: ResumeBatch,
        cancel: CancelSignal,
    ) -> Result<BatchOutcome, AppError> {
        if batch.documents.is_empty() {
            return Err(AppError::Validation(
                "Upload at least one resume before submitting.".to_string(),
            ));
        }
        if batch.job_description.trim().is_empty() {
            return Err(AppError::Validation(
                "job_description cannot be empty".to_string(),
            ));
        }

        let ResumeBatch {
            job_description,
            documents,
        } = batch;
        let keywords = tokenize_keywords(&job_description);
        info!(
            "Ranking {} resumes against {} JD keywords",
            documents.len(),
            keywords.len()
        );

        let jd = job_description.as_str();
        let keywords = keywords.as_slice();
        let outcomes: Vec<ResumeOutcome> = stream::iter(documents)
            .map(|doc| {
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return ResumeOutcome::cancelled(&doc.filename);
                    }
                    let evaluation = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return ResumeOutcome::cancelled(&doc.filename),
                        evaluation = self.evaluate(&doc, keywords, jd) => evaluation,
                    };
                    match evaluation {
                        Evaluation::Skipped(warning) => ResumeOutcome::skipped(warning),
                        Evaluation::Scored { record, warnings } => {
                            self.persist(&doc, record, warnings).await
                        }
                    }
                }
            })
            .buffered(self.options.max_concurrency.max(1))
            .collect()
            .await;

        let mut outcome = BatchOutcome::default();
        let mut records = Vec::new();
        for resume in outcomes {
            outcome.cancelled |= resume.cancelled;
            outcome.warnings.extend(resume.warnings);
            records.extend(resume.record);
        }
        outcome.results = rank_records(records);

        info!(
            "Ranked {} resumes ({} warnings{})",
            outcome.results.len(),
            outcome.warnings.len(),
            if outcome.cancelled { ", cancelled" } else { "" }
        );
        Ok(outcome)
    }

    async fn evaluate(&self, doc: &ResumeDocument, keywords: &[String], jd: &str) -> Evaluation {
        let filename = doc.filename.as_str();

        let text = match extract_text(filename, &doc.content) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {filename}: {e}");
                return Evaluation::Skipped(ItemWarning::new(
                    filename,
                    WarningKind::DocumentParse,
                    e.to_string(),
                ));
            }
        };
        if text.trim().is_empty() {
            warn!("Skipping {filename}: no extractable text");
            return Evaluation::Skipped(ItemWarning::new(
                filename,
                WarningKind::EmptyDocument,
                "No text could be extracted from this PDF",
            ));
        }

        let mut warnings = Vec::new();
        let identity = extract_identity(&text);

        let narrative = match evaluate_resume(self.narrative.as_ref(), &text, jd).await {
            Ok(narrative) => narrative,
            Err(e) => {
                warn!("Narrative evaluation failed for {filename}: {e}");
                warnings.push(ItemWarning::new(
                    filename,
                    WarningKind::NarrativeService,
                    e.to_string(),
                ));
                Narrative::default()
            }
        };

        let record = EvaluationRecord {
            candidate_name: identity.name,
            candidate_email: identity.email,
            match_percentage: match_percentage(keywords, &text),
            description: narrative.summary,
            source_filename: doc.filename.clone(),
            assessment: narrative.assessment,
        };
        info!(
            "Evaluated {filename}: {} <{}> {:.2}%",
            record.candidate_name, record.candidate_email, record.match_percentage
        );
        Evaluation::Scored { record, warnings }
    }

    /// Saves the raw upload and the record. Failures are warnings only.
    async fn persist(
        &self,
        doc: &ResumeDocument,
        record: EvaluationRecord,
        mut warnings: Vec<ItemWarning>,
    ) -> ResumeOutcome {
        let filename = doc.filename.as_str();
        if let Err(e) = self.uploads.save(filename, &doc.content).await {
            warnings.push(storage_warning(filename, e));
        }
        if let Err(e) = self.sink.insert(&record).await {
            warnings.push(storage_warning(filename, e));
        }

        ResumeOutcome {
            record: Some(record),
            warnings,
            cancelled: false,
        }
    }
}

fn storage_warning(filename: &str, err: PipelineError) -> ItemWarning {
    warn!("Persisting {filename} failed, ranking is unaffected: {err}");
    ItemWarning::new(filename, WarningKind::StorageWrite, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bytes::Bytes;

    use crate::testing::{harness, harness_with_uploads, pdf_doc, FakeNarrative, MemorySink, MemoryUploads};

    fn batch(jd: &str, documents: Vec<ResumeDocument>) -> ResumeBatch {
        ResumeBatch {
            job_description: jd.to_string(),
            documents,
        }
    }

    #[tokio::test]
    async fn test_single_resume_end_to_end() {
        let h = harness(
            FakeNarrative::replying("Good fit for a data role.\nStrong Python and AWS.\nMissing SQL."),
            MemorySink::default(),
            1,
        );
        let doc = pdf_doc(
            "jane.pdf",
            "I have Python and AWS experience, Name: Jane Doe, email jane@doe.com",
        );

        let outcome = h
            .pipeline
            .run(batch("Python SQL AWS", vec![doc]), CancelSignal::never())
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
        assert!(!outcome.cancelled);
        assert_eq!(outcome.results.len(), 1);
        let ranked = &outcome.results[0];
        assert_eq!(ranked.rank, 1);
        assert_eq!(ranked.record.candidate_name, "Jane Doe");
        assert_eq!(ranked.record.candidate_email, "jane@doe.com");
        assert!((ranked.record.match_percentage - 66.67).abs() < 0.01);
        assert_eq!(
            ranked.record.description,
            "Good fit for a data role. Strong Python and AWS."
        );

        assert_eq!(h.sink.records.lock().unwrap().len(), 1);
        assert_eq!(*h.uploads.saved.lock().unwrap(), vec!["jane.pdf".to_string()]);

        let prompts = h.narrative.prompts.lock().unwrap();
        assert!(prompts[0].contains("Name: Jane Doe"));
        assert!(prompts[0].contains("Python SQL AWS"));
    }

    #[tokio::test]
    async fn test_empty_upload_list_touches_no_collaborator() {
        let h = harness(FakeNarrative::replying("ok"), MemorySink::default(), 1);
        let err = h
            .pipeline
            .run(batch("Python", vec![]), CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(h.narrative.call_count(), 0);
        assert!(h.sink.records.lock().unwrap().is_empty());
        assert!(h.uploads.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_job_description_touches_no_collaborator() {
        let h = harness(FakeNarrative::replying("ok"), MemorySink::default(), 1);
        let err = h
            .pipeline
            .run(
                batch("   \n", vec![pdf_doc("a.pdf", "Name: A B")]),
                CancelSignal::never(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(h.narrative.call_count(), 0);
        assert!(h.sink.records.lock().unwrap().is_empty());
        assert!(h.uploads.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_pdf_is_skipped_and_batch_continues() {
        let h = harness(FakeNarrative::replying("fine"), MemorySink::default(), 1);
        let broken = ResumeDocument {
            filename: "broken.pdf".to_string(),
            content: Bytes::from_static(b"%PDF-garbage"),
        };
        let good = pdf_doc("good.pdf", "Rust engineer, Name: Sam Lee");

        let outcome = h
            .pipeline
            .run(batch("Rust", vec![broken, good]), CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].record.source_filename, "good.pdf");
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::DocumentParse);
        assert_eq!(outcome.warnings[0].filename, "broken.pdf");
        assert_eq!(h.narrative.call_count(), 1);
        assert_eq!(*h.uploads.saved.lock().unwrap(), vec!["good.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_pdf_is_skipped_as_empty_document() {
        let h = harness(FakeNarrative::replying("fine"), MemorySink::default(), 1);
        let outcome = h
            .pipeline
            .run(batch("Rust", vec![pdf_doc("blank.pdf", "   ")]), CancelSignal::never())
            .await
            .unwrap();

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.warnings[0].kind, WarningKind::EmptyDocument);
        assert_eq!(h.narrative.call_count(), 0);
    }

    #[tokio::test]
    async fn test_narrative_failure_keeps_score_and_identity() {
        let h = harness(FakeNarrative::failing(), MemorySink::default(), 1);
        let outcome = h
            .pipeline
            .run(
                batch("kafka rust", vec![pdf_doc("a.pdf", "Name: Ann Bell, rust and kafka")]),
                CancelSignal::never(),
            )
            .await
            .unwrap();

        let record = &outcome.results[0].record;
        assert_eq!(record.candidate_name, "Ann Bell");
        assert_eq!(record.match_percentage, 100.0);
        assert_eq!(record.description, "");
        assert!(record.assessment.is_none());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::NarrativeService);
        assert_eq!(h.sink.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_ranking() {
        let sink = MemorySink {
            fail: true,
            ..Default::default()
        };
        let h = harness(FakeNarrative::replying("ok"), sink, 1);
        let outcome = h
            .pipeline
            .run(batch("rust", vec![pdf_doc("a.pdf", "rust")]), CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::StorageWrite);
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_ranking_and_record() {
        let uploads = MemoryUploads {
            fail: true,
            ..Default::default()
        };
        let h = harness_with_uploads(FakeNarrative::replying("ok"), MemorySink::default(), uploads, 1);
        let outcome = h
            .pipeline
            .run(batch("rust", vec![pdf_doc("a.pdf", "Name: Ann Bell, rust")]), CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].rank, 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::StorageWrite);
        assert_eq!(outcome.warnings[0].filename, "a.pdf");
        assert!(h.uploads.saved.lock().unwrap().is_empty());
        let stored = h.sink.records.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].candidate_name, "Ann Bell");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_persistence_still_stores_and_ranks() {
        let uploads = MemoryUploads {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        let h = harness_with_uploads(FakeNarrative::replying("ok"), MemorySink::default(), uploads, 1);
        let (trigger, cancel) = CancelSignal::new();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let _ = trigger.send(true);
        });

        let docs = vec![pdf_doc("first.pdf", "rust"), pdf_doc("second.pdf", "rust")];
        let outcome = h.pipeline.run(batch("rust", docs), cancel).await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].record.source_filename, "first.pdf");
        assert_eq!(*h.uploads.saved.lock().unwrap(), vec!["first.pdf".to_string()]);
        assert_eq!(h.sink.records.lock().unwrap().len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::Cancelled);
        assert_eq!(outcome.warnings[0].filename, "second.pdf");
    }

    #[tokio::test]
    async fn test_ranks_follow_scores_with_stable_ties() {
        // Scores in upload order: 50, 100, 100, 0.
        let docs = vec![
            pdf_doc("a.pdf", "Name: Ann A, rust"),
            pdf_doc("b.pdf", "Name: Ben B, rust sql"),
            pdf_doc("c.pdf", "Name: Cat C, sql rust"),
            pdf_doc("d.pdf", "Name: Dan D, cobol"),
        ];
        for workers in [1, 4] {
            let h = harness(FakeNarrative::replying("ok"), MemorySink::default(), workers);
            let outcome = h
                .pipeline
                .run(batch("Rust SQL", docs.clone()), CancelSignal::never())
                .await
                .unwrap();

            let order: Vec<_> = outcome
                .results
                .iter()
                .map(|r| (r.rank, r.record.source_filename.as_str()))
                .collect();
            assert_eq!(
                order,
                vec![(1, "b.pdf"), (2, "c.pdf"), (3, "a.pdf"), (4, "d.pdf")],
                "max_concurrency = {workers}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_keeps_finished_records() {
        let narrative = FakeNarrative {
            reply: Some("ok".to_string()),
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        let h = harness(narrative, MemorySink::default(), 1);
        let (trigger, cancel) = CancelSignal::new();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            let _ = trigger.send(true);
        });

        let docs = vec![
            pdf_doc("first.pdf", "rust"),
            pdf_doc("second.pdf", "rust"),
            pdf_doc("third.pdf", "rust"),
        ];
        let outcome = h.pipeline.run(batch("rust", docs), cancel).await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].record.source_filename, "first.pdf");
        let cancelled: Vec<_> = outcome
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::Cancelled)
            .map(|w| w.filename.as_str())
            .collect();
        assert_eq!(cancelled, vec!["second.pdf", "third.pdf"]);
    }

    #[tokio::test]
    async fn test_never_signal_is_not_cancelled() {
        assert!(!CancelSignal::never().is_cancelled());
    }
}
