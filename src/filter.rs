//! The filter engine: resolve the active selection into the visible,
//! ordered subset of the collection.
//!
//! A pure function over (collection snapshot, selection state), recomputed
//! on every relevant change with no cached filtering. Axes compose with AND;
//! the free-text search matches with OR across a paper's text fields.

use crate::models::{Paper, Selection};
use rayon::prelude::*;

/// Papers satisfying every active axis of the selection, ordered newest
/// first by creation timestamp. Equal timestamps fall back to insertion
/// order, later insertions first, so the ordering is total.
pub fn apply(papers: &[Paper], selection: &Selection) -> Vec<Paper> {
    let needle = selection.search.trim().to_lowercase();

    let mut matched: Vec<(usize, &Paper)> = papers
        .par_iter()
        .enumerate()
        .filter(|(_, paper)| matches_selection(paper, selection, &needle))
        .collect();

    matched.sort_by(|(idx_a, a), (idx_b, b)| {
        b.added_at.cmp(&a.added_at).then_with(|| idx_b.cmp(idx_a))
    });

    matched.into_iter().map(|(_, paper)| paper.clone()).collect()
}

/// AND across the active axes; an unset axis is vacuously true.
fn matches_selection(paper: &Paper, selection: &Selection, needle: &str) -> bool {
    if let Some(topic) = selection.topic.as_deref() {
        if paper.topic != topic {
            return false;
        }
    }
    if let Some(sub_topic) = selection.sub_topic.as_deref() {
        if paper.sub_topic.as_deref() != Some(sub_topic) {
            return false;
        }
    }
    if let Some(tag) = selection.tag.as_deref() {
        if !paper.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    if !needle.is_empty() && !matches_search(paper, needle) {
        return false;
    }
    true
}

/// Case-insensitive substring match against any of: title, any author name,
/// any tag, topic, sub-topic.
fn matches_search(paper: &Paper, needle: &str) -> bool {
    paper.title.to_lowercase().contains(needle)
        || paper.authors.iter().any(|a| a.to_lowercase().contains(needle))
        || paper.tags.iter().any(|t| t.to_lowercase().contains(needle))
        || paper.topic.to_lowercase().contains(needle)
        || paper
            .sub_topic
            .as_deref()
            .map(|s| s.to_lowercase().contains(needle))
            .unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    struct MockPaper<'a> {
        title: &'a str,
        topic: &'a str,
        sub_topic: Option<&'a str>,
        tags: &'a [&'a str],
        authors: &'a [&'a str],
        added_at_secs: i64,
    }

    fn paper(mock: MockPaper) -> Paper {
        Paper {
            id: mock.title.to_string(),
            url: String::new(),
            title: mock.title.to_string(),
            summary: String::new(),
            authors: mock.authors.iter().map(|a| a.to_string()).collect(),
            topic: mock.topic.to_string(),
            sub_topic: mock.sub_topic.map(|s| s.to_string()),
            tags: mock.tags.iter().map(|t| t.to_string()).collect(),
            journal: None,
            publish_date: None,
            added_at: Utc.timestamp_opt(mock.added_at_secs, 0).unwrap(),
        }
    }

    fn simple(title: &str, topic: &str, secs: i64) -> Paper {
        paper(MockPaper {
            title,
            topic,
            sub_topic: None,
            tags: &[],
            authors: &[],
            added_at_secs: secs,
        })
    }

    #[test]
    fn test_unfiltered_is_newest_first() {
        let papers = vec![
            simple("one", "A", 1),
            simple("two", "A", 2),
            simple("three", "A", 3),
        ];
        let view = apply(&papers, &Selection::default());
        let titles: Vec<&str> = view.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_equal_timestamps_fall_back_to_insertion_order() {
        let papers = vec![
            simple("first-inserted", "A", 5),
            simple("second-inserted", "A", 5),
        ];
        let view = apply(&papers, &Selection::default());
        assert_eq!(view[0].title, "second-inserted");
        assert_eq!(view[1].title, "first-inserted");
    }

    #[test]
    fn test_tag_selection_is_global_across_topics() {
        let papers = vec![
            paper(MockPaper {
                title: "brain imaging",
                topic: "Neuroscience",
                sub_topic: None,
                tags: &["neuroscience", "fMRI"],
                authors: &[],
                added_at_secs: 1,
            }),
            paper(MockPaper {
                title: "neural nets",
                topic: "Machine Learning",
                sub_topic: None,
                tags: &["neuroscience"],
                authors: &[],
                added_at_secs: 2,
            }),
            paper(MockPaper {
                title: "transformers",
                topic: "Machine Learning",
                sub_topic: None,
                tags: &["attention"],
                authors: &[],
                added_at_secs: 3,
            }),
        ];
        let mut selection = Selection::default();
        selection.select_tag(Some("neuroscience".to_string()));
        let view = apply(&papers, &selection);
        let titles: Vec<&str> = view.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["neural nets", "brain imaging"]);
    }

    #[test]
    fn test_topic_and_sub_topic_compose_with_and() {
        let papers = vec![
            paper(MockPaper {
                title: "a/x",
                topic: "A",
                sub_topic: Some("x"),
                tags: &[],
                authors: &[],
                added_at_secs: 1,
            }),
            paper(MockPaper {
                title: "a/y",
                topic: "A",
                sub_topic: Some("y"),
                tags: &[],
                authors: &[],
                added_at_secs: 2,
            }),
            paper(MockPaper {
                title: "b/x",
                topic: "B",
                sub_topic: Some("x"),
                tags: &[],
                authors: &[],
                added_at_secs: 3,
            }),
        ];
        let mut selection = Selection::default();
        selection.select_topic(Some("A".to_string()));
        selection.select_sub_topic(Some("x".to_string()));
        let view = apply(&papers, &selection);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].title, "a/x");
    }

    #[test]
    fn test_search_matches_across_fields() {
        let papers = vec![
            paper(MockPaper {
                title: "Deep Residual Learning",
                topic: "Machine Learning",
                sub_topic: None,
                tags: &[],
                authors: &["Kaiming He"],
                added_at_secs: 1,
            }),
            paper(MockPaper {
                title: "Place Cells",
                topic: "Neuroscience",
                sub_topic: Some("Spatial Memory"),
                tags: &["hippocampus"],
                authors: &[],
                added_at_secs: 2,
            }),
        ];

        for needle in ["residual", "kaiming", "hippocampus", "neuroscience", "spatial"] {
            let mut selection = Selection::default();
            selection.set_search(needle.to_string());
            let view = apply(&papers, &selection);
            assert_eq!(view.len(), 1, "search {:?} should match exactly one", needle);
        }
    }

    #[test]
    fn test_search_composes_with_topic_axis() {
        let papers = vec![
            paper(MockPaper {
                title: "Attention in Vision",
                topic: "Machine Learning",
                sub_topic: None,
                tags: &[],
                authors: &[],
                added_at_secs: 1,
            }),
            paper(MockPaper {
                title: "Attention in the Brain",
                topic: "Neuroscience",
                sub_topic: None,
                tags: &[],
                authors: &[],
                added_at_secs: 2,
            }),
        ];
        let mut selection = Selection::default();
        selection.select_topic(Some("Neuroscience".to_string()));
        selection.set_search("attention".to_string());
        let view = apply(&papers, &selection);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].title, "Attention in the Brain");
    }

    #[test]
    fn test_topic_filter_is_exact_and_case_sensitive() {
        let papers = vec![simple("one", "ml", 1), simple("two", "ML", 2)];
        let mut selection = Selection::default();
        selection.select_topic(Some("ML".to_string()));
        let view = apply(&papers, &selection);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].title, "two");
    }
}
