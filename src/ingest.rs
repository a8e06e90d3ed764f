//! Metadata ingestion: from an analyzer's free-form reply to a stored paper.
//!
//! This module owns the whole pipeline:
//! - Recover a JSON-shaped substring from the analyzer's noisy text reply
//! - Parse and validate it into a metadata record
//! - Reject duplicate titles against the existing collection
//! - Assign identity and timestamp, insert, persist
//!
//! It also holds the client for the external analysis service and the route
//! handlers for the two ingestion entry points (URL submit, document upload).

use crate::models::{AddPaperRequest, AddPaperResponse, Paper, PaperMetadata};
use crate::shelf::{default_topic, find_duplicate, generate_id, save_papers};
use crate::url_validator::validate_url;
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
#[path = "ingest_test.rs"]
mod ingest_test;

// ============================================================================
// Failure Taxonomy
// ============================================================================

/// Everything that can end an ingestion attempt. Each variant carries enough
/// to render a human-readable reason, and `kind()` gives callers a stable
/// machine-distinguishable label. Nothing here retries automatically.
#[derive(Debug, Clone)]
pub enum IngestError {
    /// The extracted substring is not syntactically valid JSON. Carries the
    /// raw and extracted text for diagnosis.
    Parse {
        message: String,
        extracted: String,
        raw: String,
    },
    /// Parse succeeded but there is no usable title, the one field with no
    /// fallback.
    MissingTitle,
    /// Transport or service-side failure from the analyzer.
    Service(String),
    /// The analyzer answered with an empty response.
    Empty,
    /// The analyzer declined to answer (safety/copyright).
    Blocked(String),
    /// A paper with a colliding title is already on the shelf. Expected and
    /// recoverable; callers must render it non-destructively.
    DuplicateTitle(String),
    /// The submitted source locator failed validation.
    InvalidUrl(String),
    /// An ingestion from this entry point is already outstanding.
    Busy,
    /// The collection could not be persisted.
    Store(String),
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Parse { .. } => "parse",
            IngestError::MissingTitle => "missing-title",
            IngestError::Service(_) => "service",
            IngestError::Empty => "empty",
            IngestError::Blocked(_) => "blocked",
            IngestError::DuplicateTitle(_) => "duplicate",
            IngestError::InvalidUrl(_) => "invalid-url",
            IngestError::Busy => "busy",
            IngestError::Store(_) => "store",
        }
    }
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Parse {
                message,
                extracted,
                raw,
            } => write!(
                f,
                "Could not parse analyzer response as JSON: {} (extracted: {:?}; raw response: {:?})",
                message, extracted, raw
            ),
            IngestError::MissingTitle => {
                write!(f, "Analyzer response has no title; a paper cannot be added without one")
            }
            IngestError::Service(reason) => write!(f, "Analysis service failure: {}", reason),
            IngestError::Empty => write!(f, "Analysis service returned an empty response"),
            IngestError::Blocked(reason) => {
                write!(f, "Analysis service declined to answer: {}", reason)
            }
            IngestError::DuplicateTitle(title) => {
                write!(f, "A paper with this title is already on the shelf: {}", title)
            }
            IngestError::InvalidUrl(reason) => write!(f, "{}", reason),
            IngestError::Busy => {
                write!(f, "Another paper is still being analyzed; wait for it to finish")
            }
            IngestError::Store(reason) => write!(f, "Failed to persist the collection: {}", reason),
        }
    }
}

impl std::error::Error for IngestError {}

// ============================================================================
// Response Extraction
// ============================================================================

/// Recover the JSON payload from a free-form analyzer reply. Ordered tiers,
/// first match wins:
///
/// 1. A fenced code block tagged `json`: its inner content.
/// 2. The inclusive span from the first `{` to the last `}`.
/// 3. The trimmed original text, unchanged.
///
/// Never fails; invalid payloads are rejected downstream by the validator.
/// Tier 2 does not balance braces, so a stray `}` in prose after the real
/// object extends the span and corrupts extraction. Known limitation.
pub fn extract_json_payload(text: &str) -> String {
    if let Ok(re) = Regex::new(r"(?is)```json\s*(.*?)```") {
        if let Some(caps) = re.captures(text) {
            if let Some(inner) = caps.get(1) {
                return inner.as_str().trim().to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return text[start..=end].to_string();
        }
    }

    tracing::debug!("no JSON boundary found in analyzer reply; passing text through");
    text.trim().to_string()
}

// ============================================================================
// Metadata Validation
// ============================================================================

/// Parse the extracted substring and confirm the minimal shape of a metadata
/// record.
///
/// `title` is the only fatal requirement. The other required fields
/// (`summary`, `authors`, `tags`, `topic`) default when absent and each
/// absence is recorded as a non-fatal diagnostic. Partial metadata beats
/// total failure once a title exists, since the caller can still show
/// something and allow manual correction. Optional fields pass through
/// unmodified.
pub fn validate_metadata(raw: &str, extracted: &str) -> Result<PaperMetadata, IngestError> {
    let value: serde_json::Value = match serde_json::from_str(extracted) {
        Ok(value) => value,
        Err(e) => {
            return Err(IngestError::Parse {
                message: e.to_string(),
                extracted: extracted.to_string(),
                raw: raw.to_string(),
            })
        }
    };

    let title = match value
        .get("title")
        .and_then(|t| t.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        Some(title) => title.to_string(),
        None => return Err(IngestError::MissingTitle),
    };

    let mut missing: Vec<&str> = Vec::new();

    let summary = match value.get("summary").and_then(|s| s.as_str()) {
        Some(summary) if !summary.is_empty() => summary.to_string(),
        _ => {
            missing.push("summary");
            String::new()
        }
    };

    let authors = string_list(&value, "authors", &mut missing);
    let tags = string_list(&value, "tags", &mut missing);

    let topic = match value.get("topic").and_then(|t| t.as_str()) {
        Some(topic) if !topic.is_empty() => topic.to_string(),
        _ => {
            missing.push("topic");
            String::new()
        }
    };

    if !missing.is_empty() {
        tracing::warn!(
            title = %title,
            "metadata record is missing fields: {}",
            missing.join(", ")
        );
    }

    Ok(PaperMetadata {
        title,
        summary,
        authors,
        topic,
        sub_topic: optional_string(&value, "subTopic"),
        tags,
        journal: optional_string(&value, "journal"),
        publish_date: optional_string(&value, "publishDate"),
        found_url: optional_string(&value, "foundUrl"),
    })
}

/// A required list field: present-and-array yields its string elements,
/// anything else defaults to empty and records the field as missing.
fn string_list(value: &serde_json::Value, field: &'static str, missing: &mut Vec<&'static str>) -> Vec<String> {
    match value.get(field).and_then(|v| v.as_array()) {
        Some(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|s| s.to_string())
            .collect(),
        None => {
            missing.push(field);
            Vec::new()
        }
    }
}

fn optional_string(value: &serde_json::Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

// ============================================================================
// External Analysis Service
// ============================================================================

/// Client for the external analysis service that turns a source locator or
/// raw document bytes into free-form text describing the paper.
///
/// Wire contract: `POST {base}/analyze` with `{"url": …}`, or
/// `POST {base}/analyze/document` with the document bytes and a `filename`
/// query parameter. The service replies
/// `{"response": "<text>", "refusal": null | "<reason>"}`.
#[derive(Debug, Clone)]
pub struct AnalyzerClient {
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzerReply {
    response: Option<String>,
    refusal: Option<String>,
}

impl AnalyzerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var(crate::ANALYZER_URL_ENV)
            .unwrap_or_else(|_| crate::DEFAULT_ANALYZER_URL.to_string());
        Self::new(base_url)
    }

    fn http_client() -> Result<reqwest::Client, IngestError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| IngestError::Service(format!("failed to build HTTP client: {}", e)))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Ask the service to analyze the paper behind a URL.
    pub async fn analyze_url(&self, url: &str) -> Result<String, IngestError> {
        let client = Self::http_client()?;
        let response = client
            .post(self.endpoint("analyze"))
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(|e| IngestError::Service(format!("analysis request failed: {}", e)))?;
        Self::read_reply(response).await
    }

    /// Ask the service to analyze an uploaded document.
    pub async fn analyze_document(&self, filename: &str, bytes: Vec<u8>) -> Result<String, IngestError> {
        let client = Self::http_client()?;
        let response = client
            .post(self.endpoint("analyze/document"))
            .query(&[("filename", filename)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| IngestError::Service(format!("analysis request failed: {}", e)))?;
        Self::read_reply(response).await
    }

    async fn read_reply(response: reqwest::Response) -> Result<String, IngestError> {
        if !response.status().is_success() {
            return Err(IngestError::Service(format!(
                "analysis service returned {}",
                response.status()
            )));
        }

        let reply: AnalyzerReply = response
            .json()
            .await
            .map_err(|e| IngestError::Service(format!("unreadable analysis reply: {}", e)))?;

        if let Some(reason) = reply.refusal {
            return Err(IngestError::Blocked(reason));
        }

        let text = reply.response.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(IngestError::Empty);
        }
        Ok(text)
    }
}

// ============================================================================
// Ingestion Orchestration
// ============================================================================

/// Full ingestion for a submitted URL. The re-entrancy gate is held for the
/// whole attempt, analyzer call included; nothing is inserted until every
/// step has succeeded, so an abandoned attempt leaves no partial record.
pub async fn ingest_from_url(state: &AppState, url: &str) -> Result<Paper, IngestError> {
    let submitted = url.trim();
    validate_url(submitted).map_err(|e| IngestError::InvalidUrl(e.to_string()))?;

    let _permit = state.ingest_gate.acquire().ok_or(IngestError::Busy)?;
    let raw = state.analyzer.analyze_url(submitted).await?;
    finish_ingestion(state, submitted, &raw)
}

/// Full ingestion for an uploaded document. The original locator is unknown;
/// the analyzer's `foundUrl`, when present, becomes the source locator.
pub async fn ingest_from_document(
    state: &AppState,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<Paper, IngestError> {
    let _permit = state.ingest_gate.acquire().ok_or(IngestError::Busy)?;
    let raw = state.analyzer.analyze_document(filename, bytes).await?;
    finish_ingestion(state, "", &raw)
}

/// Synchronous tail of the pipeline: extract, validate, dedup, insert,
/// persist. Duplicate check and insertion happen under one lock acquisition
/// so two overlapping ingestions cannot both pass the check.
fn finish_ingestion(state: &AppState, submitted_url: &str, raw: &str) -> Result<Paper, IngestError> {
    let extracted = extract_json_payload(raw);
    let meta = validate_metadata(raw, &extracted)?;

    let mut papers = state.papers.lock().unwrap();

    if let Some(existing) = find_duplicate(&papers, &meta.title) {
        return Err(IngestError::DuplicateTitle(existing.title.clone()));
    }

    let added_at = Utc::now();
    let url = if !submitted_url.is_empty() {
        submitted_url.to_string()
    } else {
        meta.found_url.clone().unwrap_or_default()
    };
    let topic = if meta.topic.is_empty() {
        default_topic(&meta.tags)
    } else {
        meta.topic.clone()
    };

    let paper = Paper {
        id: generate_id(&meta.title, &added_at),
        url,
        title: meta.title,
        summary: meta.summary,
        authors: meta.authors,
        topic,
        sub_topic: meta.sub_topic,
        tags: meta.tags,
        journal: meta.journal,
        publish_date: meta.publish_date,
        added_at,
    };

    papers.push(paper.clone());
    if let Err(e) = save_papers(&state.db, &papers) {
        papers.pop();
        return Err(IngestError::Store(e));
    }

    tracing::info!(id = %paper.id, title = %paper.title, "paper added");
    Ok(paper)
}

// ============================================================================
// Route Handlers
// ============================================================================

pub async fn add_paper(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<AddPaperRequest>,
) -> Response {
    match ingest_from_url(&state, &body.url).await {
        Ok(paper) => axum::Json(AddPaperResponse {
            paper: Some(paper),
            error: None,
            kind: None,
        })
        .into_response(),
        Err(e) => ingest_failure(e),
    }
}

pub async fn upload_paper(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut filename = String::new();
    let mut bytes: Vec<u8> = Vec::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("document").to_string();
            match field.bytes().await {
                Ok(data) => bytes = data.to_vec(),
                Err(e) => {
                    return axum::Json(AddPaperResponse {
                        paper: None,
                        error: Some(format!("Failed to read upload: {}", e)),
                        kind: Some("invalid-input"),
                    })
                    .into_response();
                }
            }
            break;
        }
    }

    if bytes.is_empty() {
        return axum::Json(AddPaperResponse {
            paper: None,
            error: Some("No file uploaded".to_string()),
            kind: Some("invalid-input"),
        })
        .into_response();
    }

    match ingest_from_document(&state, &filename, bytes).await {
        Ok(paper) => axum::Json(AddPaperResponse {
            paper: Some(paper),
            error: None,
            kind: None,
        })
        .into_response(),
        Err(e) => ingest_failure(e),
    }
}

fn ingest_failure(e: IngestError) -> Response {
    tracing::warn!(kind = e.kind(), "ingestion failed: {}", e);
    axum::Json(AddPaperResponse {
        paper: None,
        error: Some(e.to_string()),
        kind: Some(e.kind()),
    })
    .into_response()
}
