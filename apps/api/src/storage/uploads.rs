//! Raw upload persistence, keyed by the original filename.
//!
//! Same filename overwrites. Only the final path component of the uploaded
//! name is used, so `../../etc/passwd` lands as `passwd` inside the store.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::config::S3Config;
use crate::errors::PipelineError;

#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn save(&self, filename: &str, content: &Bytes) -> Result<(), PipelineError>;
}

/// Writes uploads into a directory on local disk.
pub struct LocalUploadStore {
    root: PathBuf,
}

impl LocalUploadStore {
    /// Opens the store, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create upload directory {}", root.display()))?;
        info!("Saving uploads to {}", root.display());
        Ok(Self { root })
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, PipelineError> {
        let name = safe_basename(filename).ok_or_else(|| {
            PipelineError::StorageWrite(format!("Unusable upload filename '{filename}'"))
        })?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn save(&self, filename: &str, content: &Bytes) -> Result<(), PipelineError> {
        let path = self.path_for(filename)?;
        let write_err = |e: std::io::Error| {
            PipelineError::StorageWrite(format!("Failed to write {}: {e}", path.display()))
        };

        let mut file = tokio::fs::File::create(&path).await.map_err(write_err)?;
        file.write_all(content).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        Ok(())
    }
}

/// Puts uploads into an S3 / MinIO bucket under `resumes/`.
pub struct S3UploadStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3UploadStore {
    pub async fn connect(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "ranker-static",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let s3_config = loader.load().await;

        info!("Saving uploads to s3://{}/resumes/", config.bucket);
        Self {
            client: aws_sdk_s3::Client::new(&s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl UploadStore for S3UploadStore {
    async fn save(&self, filename: &str, content: &Bytes) -> Result<(), PipelineError> {
        let name = safe_basename(filename).ok_or_else(|| {
            PipelineError::StorageWrite(format!("Unusable upload filename '{filename}'"))
        })?;
        let key = format!("resumes/{name}");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(content.clone()))
            .content_type("application/pdf")
            .send()
            .await
            .map_err(|e| PipelineError::StorageWrite(format!("S3 upload of {key} failed: {e}")))?;
        Ok(())
    }
}

/// Final path component of an uploaded filename, accepting both separators.
fn safe_basename(filename: &str) -> Option<String> {
    let last = filename.rsplit(&['/', '\\'][..]).next()?;
    Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
}
