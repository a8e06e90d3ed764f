//! Papershelf library - re-exports for testing and external use.
//!
//! The collection of papers owned by `AppState` is the single source of
//! truth; taxonomy counts and the filtered view are recomputed from it on
//! every relevant change and never cached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub mod filter;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod shelf;
pub mod taxonomy;
pub mod templates;
pub mod url_validator;

// ============================================================================
// Configuration
// ============================================================================

pub const DB_PATH: &str = ".papershelf_db";
pub const DB_PATH_ENV: &str = "PAPERSHELF_DB";
pub const ANALYZER_URL_ENV: &str = "PAPERSHELF_ANALYZER_URL";
pub const DEFAULT_ANALYZER_URL: &str = "http://127.0.0.1:8742";
pub const BIND_ADDR: &str = "127.0.0.1:3000";

// ============================================================================
// Ingestion Gate
// ============================================================================

/// Guards the add-paper entry point against re-entrant submission: the
/// permit is held for the whole ingestion, the long analyzer call included,
/// and a second acquire while one is live fails fast. Dropping the permit
/// releases the gate, whether the attempt succeeded, failed, or was
/// abandoned.
pub struct IngestGate {
    busy: AtomicBool,
}

impl IngestGate {
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    pub fn acquire(&self) -> Option<IngestPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .ok()
            .map(|_| IngestPermit { gate: self })
    }
}

impl Default for IngestGate {
    fn default() -> Self {
        Self::new()
    }
}

pub struct IngestPermit<'a> {
    gate: &'a IngestGate,
}

impl Drop for IngestPermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub db: sled::Db,
    pub papers: Mutex<Vec<Paper>>,
    pub selection: Mutex<Selection>,
    pub analyzer: AnalyzerClient,
    pub ingest_gate: IngestGate,
}

impl AppState {
    pub fn new() -> Self {
        let db_path = std::env::var(DB_PATH_ENV).unwrap_or_else(|_| DB_PATH.to_string());
        let db = sled::open(&db_path).expect("Failed to open database");
        let papers = shelf::load_papers(&db);

        Self {
            db,
            papers: Mutex::new(papers),
            selection: Mutex::new(Selection::default()),
            analyzer: AnalyzerClient::from_env(),
            ingest_gate: IngestGate::new(),
        }
    }

    /// The current filtered, sorted view plus the taxonomy mappings,
    /// recomputed from the live collection.
    pub fn shelf_view(&self) -> ShelfView {
        let papers = self.papers.lock().unwrap();
        let selection = self.selection.lock().unwrap().clone();

        ShelfView {
            topic_counts: taxonomy::topic_counts(&papers),
            sub_topic_counts: taxonomy::sub_topic_counts(&papers, selection.topic.as_deref()),
            tag_counts: taxonomy::tag_counts(&papers),
            total: papers.len(),
            papers: filter::apply(&papers, &selection),
            selection,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// Re-export commonly used types
pub use filter::apply as apply_filter;
pub use ingest::{
    extract_json_payload, ingest_from_document, ingest_from_url, validate_metadata, AnalyzerClient,
    IngestError,
};
pub use models::{
    AddPaperRequest, AddPaperResponse, ErrorResponse, LabelCount, Paper, PaperMetadata, Selection,
    SelectionRequest, ShelfView, UpdatePaperRequest,
};
pub use shelf::{
    default_topic, find_duplicate, generate_id, load_papers, normalize_title, save_papers,
    upgrade_record, FALLBACK_TOPIC, PAPERS_KEY,
};
pub use taxonomy::{sub_topic_counts, tag_counts, topic_counts};
pub use templates::{base_html, html_escape, render_markdown, render_shelf};
pub use url_validator::{validate_url, UrlValidationError};
