//! Axum route handlers for the Ranking API.

use std::path::Path;

use axum::{
    extract::{Multipart, State},
    response::Html,
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::evaluation::{ItemWarning, RankingRow, ResumeDocument};
use crate::ranking::pipeline::{CancelSignal, ResumeBatch};
use crate::state::AppState;

const JOB_DESCRIPTION_FIELD: &str = "job_description";
const RESUMES_FIELD: &str = "resumes";

#[derive(Debug, Serialize)]
pub struct RankingResponse {
    pub rankings: Vec<RankingRow>,
    pub warnings: Vec<ItemWarning>,
    pub cancelled: bool,
}

/// POST /api/v1/rankings
///
/// Multipart form: one `job_description` text field and one or more `resumes`
/// PDF files. Returns the ranked table plus per-resume warnings.
pub async fn handle_rank(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RankingResponse>, AppError> {
    let batch = read_batch(multipart).await?;

    let (trigger, cancel) = CancelSignal::new();
    let deadline = state.batch_timeout;
    let watchdog = tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        let _ = trigger.send(true);
    });
    let outcome = state.pipeline.run(batch, cancel).await;
    watchdog.abort();
    let outcome = outcome?;

    Ok(Json(RankingResponse {
        rankings: outcome.results.iter().map(RankingRow::from).collect(),
        warnings: outcome.warnings,
        cancelled: outcome.cancelled,
    }))
}

/// GET /
pub async fn handle_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

async fn read_batch(mut multipart: Multipart) -> Result<ResumeBatch, AppError> {
    let mut batch = ResumeBatch::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(JOB_DESCRIPTION_FIELD) => {
                batch.job_description = field.text().await?;
            }
            Some(RESUMES_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    // Browsers send an empty file part when nothing was selected.
                    let _ = field.bytes().await?;
                    continue;
                }
                if !is_pdf_filename(&filename) {
                    return Err(AppError::Validation(format!(
                        "'{filename}' is not a PDF. Only .pdf resumes are accepted."
                    )));
                }
                let content = field.bytes().await?;
                batch.documents.push(ResumeDocument { filename, content });
            }
            _ => {
                let _ = field.bytes().await?;
            }
        }
    }

    Ok(batch)
}

fn is_pdf_filename(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

const UPLOAD_FORM: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Resume Ranking System</title>
<style>
  body { font-family: sans-serif; max-width: 60rem; margin: 2rem auto; }
  textarea { width: 100%; height: 12rem; }
  table { border-collapse: collapse; margin-top: 1.5rem; width: 100%; }
  th, td { border: 1px solid #ccc; padding: 0.4rem 0.6rem; text-align: left; }
  .warning { color: #a15c00; }
</style>
</head>
<body>
<h1>Resume Ranking System</h1>
<form id="rank-form">
  <label>Paste the Job Description<br><textarea name="job_description" required></textarea></label>
  <p><label>Upload Your Resumes <input type="file" name="resumes" accept=".pdf,application/pdf" multiple required></label></p>
  <button type="submit">Submit</button>
</form>
<div id="output"></div>
<script>
const form = document.getElementById("rank-form");
const output = document.getElementById("output");
const esc = (s) => String(s).replace(/[&<>"]/g, (c) => ({"&": "&amp;", "<": "&lt;", ">": "&gt;", '"': "&quot;"}[c]));
form.addEventListener("submit", async (event) => {
  event.preventDefault();
  output.textContent = "Ranking...";
  const response = await fetch("/api/v1/rankings", { method: "POST", body: new FormData(form) });
  const body = await response.json();
  if (!response.ok) {
    output.innerHTML = `<p class="warning">${esc(body.error.message)}</p>`;
    return;
  }
  const rows = body.rankings.map((r) =>
    `<tr><td>${esc(r.candidate_name)}</td><td>${esc(r.candidate_email)}</td><td>${r.rank}</td><td>${r.match_percentage.toFixed(2)}</td></tr>`).join("");
  const warnings = body.warnings.map((w) => `<li class="warning">${esc(w.filename)}: ${esc(w.message)}</li>`).join("");
  output.innerHTML = `<table><tr><th>CANDIDATE_NAME</th><th>CANDIDATE_EMAIL</th><th>RANK</th><th>MATCH_PERCENTAGE</th></tr>${rows}</table><ul>${warnings}</ul>`;
});
</script>
</body>
</html>
"#;
