//! HTTP route handlers for the shelf surface.
//!
//! Ingestion handlers live with their pipeline in `ingest`; this module
//! covers the browse surface: the rendered shelf, the JSON view, the
//! selection setters, and paper editing/removal.

use crate::models::{ErrorResponse, SelectionRequest, UpdatePaperRequest};
use crate::shelf::{default_topic, normalize_title, save_papers};
use crate::templates;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;

// ============================================================================
// Shelf Views
// ============================================================================

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let view = state.shelf_view();
    Html(templates::render_shelf(&view))
}

pub async fn shelf_api(State(state): State<Arc<AppState>>) -> Response {
    axum::Json(state.shelf_view()).into_response()
}

// ============================================================================
// Selection
// ============================================================================

/// Apply one selection mutation and return the refreshed view. The setters
/// on `Selection` enforce the cascading-clear rules.
pub async fn set_selection(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<SelectionRequest>,
) -> Response {
    {
        let mut selection = state.selection.lock().unwrap();
        match body.axis.as_str() {
            "topic" => selection.select_topic(body.value),
            "subTopic" => selection.select_sub_topic(body.value),
            "tag" => selection.select_tag(body.value),
            "search" => selection.set_search(body.value.unwrap_or_default()),
            other => {
                return axum::Json(ErrorResponse {
                    error: format!("Unknown selection axis: {}", other),
                    kind: "invalid-input",
                })
                .into_response();
            }
        }
    }

    axum::Json(state.shelf_view()).into_response()
}

// ============================================================================
// Paper Editing
// ============================================================================

/// Patch the user-editable fields of a paper. A title change is re-checked
/// against the duplicate rule; the collection is persisted before the patch
/// is acknowledged.
pub async fn update_paper(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<UpdatePaperRequest>,
) -> Response {
    let mut papers = state.papers.lock().unwrap();

    let Some(index) = papers.iter().position(|p| p.id == id) else {
        return not_found();
    };
    let original = papers[index].clone();

    if let Some(title) = body.title.as_deref().map(str::trim) {
        if title.is_empty() {
            return axum::Json(ErrorResponse {
                error: "Title cannot be empty".to_string(),
                kind: "invalid-input",
            })
            .into_response();
        }
        let needle = normalize_title(title);
        let collision = papers
            .iter()
            .enumerate()
            .any(|(i, p)| i != index && normalize_title(&p.title) == needle);
        if collision {
            return axum::Json(ErrorResponse {
                error: format!("A paper with this title is already on the shelf: {}", title),
                kind: "duplicate",
            })
            .into_response();
        }
        papers[index].title = title.to_string();
    }

    if let Some(summary) = body.summary {
        papers[index].summary = summary;
    }
    if let Some(topic) = body.topic.map(|t| t.trim().to_string()) {
        papers[index].topic = if topic.is_empty() {
            default_topic(&papers[index].tags)
        } else {
            topic
        };
    }
    if let Some(sub_topic) = body.sub_topic {
        let sub_topic = sub_topic.trim().to_string();
        papers[index].sub_topic = if sub_topic.is_empty() { None } else { Some(sub_topic) };
    }
    if let Some(tags) = body.tags {
        papers[index].tags = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
    if let Some(journal) = body.journal {
        let journal = journal.trim().to_string();
        papers[index].journal = if journal.is_empty() { None } else { Some(journal) };
    }
    if let Some(publish_date) = body.publish_date {
        let publish_date = publish_date.trim().to_string();
        papers[index].publish_date = if publish_date.is_empty() { None } else { Some(publish_date) };
    }

    if let Err(e) = save_papers(&state.db, &papers) {
        papers[index] = original;
        return axum::Json(ErrorResponse {
            error: format!("Failed to persist the collection: {}", e),
            kind: "store",
        })
        .into_response();
    }

    axum::Json(papers[index].clone()).into_response()
}

pub async fn delete_paper(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let mut papers = state.papers.lock().unwrap();

    let Some(index) = papers.iter().position(|p| p.id == id) else {
        return not_found();
    };
    let removed = papers.remove(index);

    if let Err(e) = save_papers(&state.db, &papers) {
        papers.insert(index, removed);
        return axum::Json(ErrorResponse {
            error: format!("Failed to persist the collection: {}", e),
            kind: "store",
        })
        .into_response();
    }

    tracing::info!(id = %removed.id, title = %removed.title, "paper removed");
    axum::Json(serde_json::json!({ "deleted": removed.id })).into_response()
}

fn not_found() -> Response {
    axum::Json(ErrorResponse {
        error: "Paper not found".to_string(),
        kind: "not-found",
    })
    .into_response()
}
