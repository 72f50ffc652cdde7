use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub llm_base_url: Option<String>,
    pub storage_uri: String,
    pub save_directory: PathBuf,
    pub s3: Option<S3Config>,
    pub port: u16,
    pub rust_log: String,
    pub llm_timeout_secs: u64,
    pub batch_timeout_secs: u64,
    pub max_concurrency: usize,
    pub max_upload_mb: usize,
}

/// Bucket settings for storing raw uploads in S3 / MinIO instead of a local directory.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3 = match optional_env("S3_BUCKET") {
            Some(bucket) => Some(S3Config {
                bucket,
                endpoint: optional_env("S3_ENDPOINT"),
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        Ok(Config {
            api_key: require_env("LLM_API_KEY")?,
            llm_base_url: optional_env("LLM_BASE_URL"),
            storage_uri: require_env("STORAGE_URI")?,
            save_directory: optional_env("SAVE_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploaded_resumes")),
            s3,
            port: parse_or("PORT", optional_env("PORT"), 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            llm_timeout_secs: parse_or("LLM_TIMEOUT_SECS", optional_env("LLM_TIMEOUT_SECS"), 60)?,
            batch_timeout_secs: parse_or(
                "BATCH_TIMEOUT_SECS",
                optional_env("BATCH_TIMEOUT_SECS"),
                600,
            )?,
            max_concurrency: parse_or("MAX_CONCURRENCY", optional_env("MAX_CONCURRENCY"), 1)?,
            max_upload_mb: parse_or("MAX_UPLOAD_MB", optional_env("MAX_UPLOAD_MB"), 20)?,
        })
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{value}'")),
        None => Ok(default),
    }
}
