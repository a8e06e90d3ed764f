//! Collection storage and admission.
//!
//! The whole collection persists as one JSON array of papers in a single
//! sled key (the storage slot). This module owns loading (including the
//! legacy-record upgrade), saving, title normalization for the duplicate
//! check, and id assignment.

use crate::models::Paper;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Storage slot for the serialized collection.
pub const PAPERS_KEY: &str = "papers";

/// Topic assigned to records that have no topic and no tags to derive one
/// from. Also the default for validated metadata that arrived without one.
pub const FALLBACK_TOPIC: &str = "General";

// ============================================================================
// Title Normalization & Duplicate Check
// ============================================================================

/// Normalize a title for the duplicate check: trim surrounding whitespace
/// and lowercase. Deliberately narrower than fuzzy matching: punctuation
/// and inner spacing stay significant.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Find an existing paper whose title collides with the candidate title.
pub fn find_duplicate<'a>(papers: &'a [Paper], title: &str) -> Option<&'a Paper> {
    let needle = normalize_title(title);
    papers.iter().find(|p| normalize_title(&p.title) == needle)
}

// ============================================================================
// Id Assignment & Topic Defaulting
// ============================================================================

/// Short content-hash id over the title and creation instant. Both inputs
/// are fixed at insertion, so the id never changes afterwards.
pub fn generate_id(title: &str, added_at: &DateTime<Utc>) -> String {
    use sha2::Digest;
    let mut hasher = sha2::Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(added_at.to_rfc3339().as_bytes());
    let result = hasher.finalize();
    result[..6].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Topic for a record that arrived without one: the first tag if any tag
/// exists, else the fixed fallback label. The same rule serves the legacy
/// upgrade and freshly validated metadata.
pub fn default_topic(tags: &[String]) -> String {
    tags.iter()
        .find(|t| !t.is_empty())
        .cloned()
        .unwrap_or_else(|| FALLBACK_TOPIC.to_string())
}

// ============================================================================
// Legacy Record Upgrade
// ============================================================================

/// Upgrade a stored record in place to the current shape: an absent `tags`
/// field becomes an empty list, and an absent (or empty) `topic` defaults to
/// the first tag, else the fallback label. Idempotent; conforming records
/// are left untouched.
pub fn upgrade_record(record: &mut Value) {
    let Some(obj) = record.as_object_mut() else {
        return;
    };

    if !obj.get("tags").map(|t| t.is_array()).unwrap_or(false) {
        obj.insert("tags".to_string(), Value::Array(Vec::new()));
    }

    let has_topic = obj
        .get("topic")
        .and_then(|t| t.as_str())
        .map(|t| !t.is_empty())
        .unwrap_or(false);
    if !has_topic {
        let topic = obj
            .get("tags")
            .and_then(|t| t.as_array())
            .and_then(|tags| tags.iter().find_map(|v| v.as_str().filter(|s| !s.is_empty())))
            .map(|s| s.to_string())
            .unwrap_or_else(|| FALLBACK_TOPIC.to_string());
        obj.insert("topic".to_string(), Value::String(topic));
    }
}

// ============================================================================
// Load / Save
// ============================================================================

/// Load the collection from the storage slot, applying the legacy upgrade.
/// A missing slot is an empty shelf; records that still fail to deserialize
/// after the upgrade are skipped with a warning rather than poisoning the
/// whole load.
pub fn load_papers(db: &sled::Db) -> Vec<Paper> {
    let bytes = match db.get(PAPERS_KEY) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::error!("failed to read paper collection: {}", e);
            return Vec::new();
        }
    };

    let mut records: Vec<Value> = match serde_json::from_slice(&bytes) {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("stored paper collection is unreadable: {}", e);
            return Vec::new();
        }
    };

    for record in &mut records {
        upgrade_record(record);
    }

    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Paper>(record) {
            Ok(paper) => Some(paper),
            Err(e) => {
                tracing::warn!("skipping malformed stored record: {}", e);
                None
            }
        })
        .collect()
}

/// Serialize the collection into the storage slot and flush.
pub fn save_papers(db: &sled::Db, papers: &[Paper]) -> Result<(), String> {
    let bytes = serde_json::to_vec(papers)
        .map_err(|e| format!("failed to serialize collection: {}", e))?;
    db.insert(PAPERS_KEY, bytes)
        .map_err(|e| format!("failed to write collection: {}", e))?;
    db.flush()
        .map_err(|e| format!("failed to flush collection: {}", e))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mock_paper(title: &str, topic: &str) -> Paper {
        let added_at = Utc::now();
        Paper {
            id: generate_id(title, &added_at),
            url: String::new(),
            title: title.to_string(),
            summary: String::new(),
            authors: Vec::new(),
            topic: topic.to_string(),
            sub_topic: None,
            tags: Vec::new(),
            journal: None,
            publish_date: None,
            added_at,
        }
    }

    #[test]
    fn test_duplicate_despite_case_and_whitespace() {
        let papers = vec![mock_paper("  attention is all you need ", "ML")];
        assert!(find_duplicate(&papers, "Attention Is All You Need").is_some());
    }

    #[test]
    fn test_distinct_title_is_admitted() {
        let papers = vec![mock_paper("Attention Is All You Need", "ML")];
        assert!(find_duplicate(&papers, "Deep Residual Learning").is_none());
    }

    #[test]
    fn test_inner_whitespace_stays_significant() {
        let papers = vec![mock_paper("Attention Is All You Need", "ML")];
        assert!(find_duplicate(&papers, "AttentionIsAllYouNeed").is_none());
    }

    #[test]
    fn test_upgrade_defaults_topic_from_first_tag() {
        let mut record = json!({
            "id": "x1", "url": "", "title": "Old Record", "summary": "",
            "authors": [], "tags": ["fMRI", "memory"],
            "addedAt": "2023-01-01T00:00:00Z"
        });
        upgrade_record(&mut record);
        assert_eq!(record["topic"], "fMRI");
        assert_eq!(record["tags"], json!(["fMRI", "memory"]));
    }

    #[test]
    fn test_upgrade_defaults_missing_tags_and_fallback_topic() {
        let mut record = json!({
            "id": "x2", "url": "", "title": "Older Record", "summary": "",
            "authors": [], "addedAt": "2023-01-01T00:00:00Z"
        });
        upgrade_record(&mut record);
        assert_eq!(record["topic"], FALLBACK_TOPIC);
        assert_eq!(record["tags"], json!([]));
    }

    #[test]
    fn test_upgrade_is_idempotent_on_conforming_records() {
        let mut record = json!({
            "id": "x3", "url": "", "title": "Current Record", "summary": "",
            "authors": [], "topic": "Neuroscience", "tags": ["fMRI"],
            "addedAt": "2023-01-01T00:00:00Z"
        });
        let before = record.clone();
        upgrade_record(&mut record);
        assert_eq!(record, before);
    }

    #[test]
    fn test_default_topic_skips_empty_tags() {
        assert_eq!(default_topic(&["".to_string(), "memory".to_string()]), "memory");
        assert_eq!(default_topic(&[]), FALLBACK_TOPIC);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let papers = vec![
            mock_paper("First Paper", "A"),
            mock_paper("Second Paper", "B"),
        ];
        save_papers(&db, &papers).unwrap();
        let loaded = load_papers(&db);
        assert_eq!(loaded, papers);
    }

    #[test]
    fn test_load_upgrades_legacy_records() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let legacy = json!([{
            "id": "x4", "url": "", "title": "Legacy", "summary": "",
            "authors": [], "tags": ["fMRI", "memory"],
            "addedAt": "2023-01-01T00:00:00Z"
        }]);
        db.insert(PAPERS_KEY, serde_json::to_vec(&legacy).unwrap()).unwrap();
        let loaded = load_papers(&db);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].topic, "fMRI");
        assert_eq!(loaded[0].tags, vec!["fMRI", "memory"]);
    }

    #[test]
    fn test_load_missing_slot_is_empty_shelf() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        assert!(load_papers(&db).is_empty());
    }

    #[test]
    fn test_generated_ids_are_stable_and_short() {
        let at = Utc::now();
        let a = generate_id("Some Title", &at);
        let b = generate_id("Some Title", &at);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert_ne!(a, generate_id("Other Title", &at));
    }
}
