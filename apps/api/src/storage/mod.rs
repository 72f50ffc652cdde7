//! Write-side collaborators of the ranking pipeline.
//!
//! The pipeline never reads back what it stores; both seams are write-only.

pub mod uploads;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::models::evaluation::EvaluationRecord;

pub use uploads::{LocalUploadStore, S3UploadStore, UploadStore};

/// Durable sink for evaluation records, one insert per processed resume.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert(&self, record: &EvaluationRecord) -> Result<(), PipelineError>;
}

/// Stores records in the `evaluations` table.
pub struct PgRecordSink {
    pool: PgPool,
}

impl PgRecordSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSink for PgRecordSink {
    async fn insert(&self, record: &EvaluationRecord) -> Result<(), PipelineError> {
        let assessment = record
            .assessment
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| PipelineError::StorageWrite(format!("Failed to serialize assessment: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO evaluations
                (id, candidate_name, candidate_email, match_percentage,
                 description, source_filename, assessment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.candidate_name)
        .bind(&record.candidate_email)
        .bind(record.match_percentage)
        .bind(&record.description)
        .bind(&record.source_filename)
        .bind(assessment)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::StorageWrite(e.to_string()))?;

        Ok(())
    }
}

/// Creates the `evaluations` table if it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evaluations (
            id UUID PRIMARY KEY,
            candidate_name TEXT NOT NULL,
            candidate_email TEXT NOT NULL,
            match_percentage DOUBLE PRECISION NOT NULL,
            description TEXT NOT NULL,
            source_filename TEXT NOT NULL,
            assessment JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("evaluations table ready");
    Ok(())
}
