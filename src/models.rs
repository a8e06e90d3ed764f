//! Data models for the paper shelf.
//!
//! This module contains the core data structures used throughout the
//! application: the persisted paper entity, the transient metadata record
//! produced by ingestion, the filter selection state, and the request/
//! response types for the API surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Papers
// ============================================================================

/// A paper on the shelf. Serialized field names are the persisted collection
/// format; do not rename them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    /// Opaque unique id, assigned at insertion and never changed.
    pub id: String,
    /// Source locator. Empty for uploads where no canonical URL was found.
    pub url: String,
    pub title: String,
    /// Paraphrased abstract text. May contain markdown.
    pub summary: String,
    pub authors: Vec<String>,
    /// Single required classification label.
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_topic: Option<String>,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    /// Human-readable publish date, kept verbatim from the analyzer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    /// Set once at insertion; the display ordering key.
    pub added_at: DateTime<Utc>,
}

/// Structured description of a paper before it is assigned identity and
/// stored. Produced by the ingestion pipeline from the analyzer's reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PaperMetadata {
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub topic: String,
    pub sub_topic: Option<String>,
    pub tags: Vec<String>,
    pub journal: Option<String>,
    pub publish_date: Option<String>,
    /// Resolved canonical locator, reported by the analyzer on the
    /// document-upload path where the original URL is unknown.
    pub found_url: Option<String>,
}

// ============================================================================
// Filter Selection State
// ============================================================================

/// The active filter axes. Mutate only through the setters below: they
/// enforce the cascading-clear rules that keep the state consistent
/// (a sub-topic never outlives its topic, a tag selection is a global view).
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub topic: Option<String>,
    pub sub_topic: Option<String>,
    pub tag: Option<String>,
    pub search: String,
}

impl Selection {
    /// Selecting a topic (or clearing it) drops the sub-topic and tag.
    pub fn select_topic(&mut self, topic: Option<String>) {
        self.topic = topic;
        self.sub_topic = None;
        self.tag = None;
    }

    /// A sub-topic only means something under its parent topic; with no
    /// topic selected the sub-topic stays unset.
    pub fn select_sub_topic(&mut self, sub_topic: Option<String>) {
        if self.topic.is_some() {
            self.sub_topic = sub_topic;
        } else {
            self.sub_topic = None;
        }
    }

    /// Tag selection is a global, topic-independent view: picking a tag
    /// drops the topic and sub-topic. Clearing the tag leaves them alone.
    pub fn select_tag(&mut self, tag: Option<String>) {
        if tag.is_some() {
            self.topic = None;
            self.sub_topic = None;
        }
        self.tag = tag;
    }

    pub fn set_search(&mut self, search: String) {
        self.search = search;
    }
}

// ============================================================================
// Taxonomy Counts
// ============================================================================

/// One taxonomy entry: a topic, sub-topic, or tag label with its occurrence
/// count over the current collection.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AddPaperRequest {
    pub url: String,
}

/// One selection mutation: which axis to set and the new value (None clears).
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionRequest {
    pub axis: String,
    pub value: Option<String>,
}

/// Patch for user-editable paper fields. Absent fields are left unchanged;
/// for the optional text fields an empty string clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePaperRequest {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub topic: Option<String>,
    pub sub_topic: Option<String>,
    pub tags: Option<Vec<String>>,
    pub journal: Option<String>,
    pub publish_date: Option<String>,
}

/// The filtered, sorted view of the shelf plus the taxonomy mappings,
/// recomputed from the live collection on every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfView {
    pub papers: Vec<Paper>,
    pub topic_counts: Vec<LabelCount>,
    pub sub_topic_counts: Vec<LabelCount>,
    pub tag_counts: Vec<LabelCount>,
    pub selection: Selection,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddPaperResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper: Option<Paper>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

// ============================================================================
// Tests
// ============================================================================
