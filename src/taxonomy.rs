//! Derived taxonomy counts over the paper collection.
//!
//! Pure functions recomputed from the full collection on each change,
//! with no incremental index to drift out of sync. Counts come back sorted
//! descending by count; ties break ascending by label so snapshot-style
//! assertions stay deterministic.

use crate::models::{LabelCount, Paper};
use std::collections::HashMap;

/// Topic → occurrence count over the whole collection, one occurrence per
/// paper by its single topic field. Zero-count entries are absent.
pub fn topic_counts(papers: &[Paper]) -> Vec<LabelCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for paper in papers {
        *counts.entry(paper.topic.as_str()).or_insert(0) += 1;
    }
    sorted(counts)
}

/// Sub-topic → occurrence count over papers matching the selected topic that
/// have a sub-topic. No selected topic means an empty mapping.
pub fn sub_topic_counts(papers: &[Paper], selected_topic: Option<&str>) -> Vec<LabelCount> {
    let Some(topic) = selected_topic else {
        return Vec::new();
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for paper in papers {
        if paper.topic != topic {
            continue;
        }
        if let Some(sub) = paper.sub_topic.as_deref() {
            if !sub.is_empty() {
                *counts.entry(sub).or_insert(0) += 1;
            }
        }
    }
    sorted(counts)
}

/// Tag → occurrence count over the whole collection, counting each paper at
/// most once per tag. Feeds the global tag filter in the sidebar.
pub fn tag_counts(papers: &[Paper]) -> Vec<LabelCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for paper in papers {
        for tag in &paper.tags {
            if !tag.is_empty() {
                *counts.entry(tag.as_str()).or_insert(0) += 1;
            }
        }
    }
    sorted(counts)
}

fn sorted(counts: HashMap<&str, usize>) -> Vec<LabelCount> {
    let mut entries: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mock_paper(topic: &str, sub_topic: Option<&str>, tags: &[&str]) -> Paper {
        Paper {
            id: String::new(),
            url: String::new(),
            title: format!("{} paper", topic),
            summary: String::new(),
            authors: Vec::new(),
            topic: topic.to_string(),
            sub_topic: sub_topic.map(|s| s.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            journal: None,
            publish_date: None,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_topic_counts_sorted_descending() {
        let papers = vec![
            mock_paper("A", None, &[]),
            mock_paper("A", None, &[]),
            mock_paper("B", None, &[]),
        ];
        let counts = topic_counts(&papers);
        assert_eq!(
            counts,
            vec![
                LabelCount { label: "A".to_string(), count: 2 },
                LabelCount { label: "B".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_topic_count_ties_break_alphabetically() {
        let papers = vec![
            mock_paper("Zeta", None, &[]),
            mock_paper("Alpha", None, &[]),
        ];
        let counts = topic_counts(&papers);
        assert_eq!(counts[0].label, "Alpha");
        assert_eq!(counts[1].label, "Zeta");
    }

    #[test]
    fn test_sub_topic_counts_require_selected_topic() {
        let papers = vec![mock_paper("A", Some("x"), &[])];
        assert!(sub_topic_counts(&papers, None).is_empty());
    }

    #[test]
    fn test_sub_topic_counts_scope_to_topic() {
        let papers = vec![
            mock_paper("A", Some("x"), &[]),
            mock_paper("A", Some("x"), &[]),
            mock_paper("A", Some("y"), &[]),
            mock_paper("A", None, &[]),
            mock_paper("B", Some("x"), &[]),
        ];
        let counts = sub_topic_counts(&papers, Some("A"));
        assert_eq!(
            counts,
            vec![
                LabelCount { label: "x".to_string(), count: 2 },
                LabelCount { label: "y".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_topic_equality_is_case_sensitive() {
        let papers = vec![
            mock_paper("Neuroscience", None, &[]),
            mock_paper("neuroscience", None, &[]),
        ];
        let counts = topic_counts(&papers);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_tag_counts_span_topics() {
        let papers = vec![
            mock_paper("A", None, &["shared", "only-a"]),
            mock_paper("B", None, &["shared"]),
        ];
        let counts = tag_counts(&papers);
        assert_eq!(counts[0].label, "shared");
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].label, "only-a");
    }
}
