//! Segment merging.
//!
//! Groups consecutive transcript segments into coarser chunks to balance
//! retrieval granularity against context size. Deterministic and
//! order-preserving; no reordering, no deduplication.

use crate::transcription::Segment;
use serde::{Deserialize, Serialize};

/// A merged run of consecutive segments treated as one retrievable unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedChunk {
    /// Video title (taken from the first segment of the group).
    pub title: String,
    /// Episode number.
    #[serde(rename = "Number")]
    pub number: String,
    /// Start time of the first segment in the group.
    pub start: f64,
    /// End time of the last segment in the group.
    pub end: f64,
    /// Space-joined segment texts, in order.
    pub text: String,
}

/// A merged transcript document, mirroring the per-file transcript layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedDocument {
    /// Merged chunks.
    pub chunks: Vec<MergedChunk>,
    /// Full transcript text carried over from the source document.
    pub text: String,
}

/// Merge segments into consecutive groups of `merge_size`.
///
/// The last group may be shorter. For N segments and merge size M this
/// yields ceil(N/M) chunks whose concatenated text reproduces the segment
/// texts in order.
pub fn merge_segments(segments: &[Segment], merge_size: usize) -> Vec<MergedChunk> {
    assert!(merge_size >= 1, "merge size must be at least 1");

    segments
        .chunks(merge_size)
        .map(|group| {
            let first = &group[0];
            let last = &group[group.len() - 1];
            MergedChunk {
                title: first.title.clone(),
                number: first.number.clone(),
                start: first.start,
                end: last.end,
                text: group
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(n: usize) -> Vec<Segment> {
        (0..n)
            .map(|i| Segment {
                title: "Intro".to_string(),
                number: "1".to_string(),
                start: i as f64 * 10.0,
                end: (i + 1) as f64 * 10.0,
                text: format!("seg{}", i),
                original_text: format!("seg{}", i),
                translated_text: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_merge_counts() {
        for (n, m, expected) in [(12, 5, 3), (10, 5, 2), (1, 5, 1), (7, 1, 7), (0, 3, 0)] {
            assert_eq!(merge_segments(&segments(n), m).len(), expected);
        }
    }

    #[test]
    fn test_twelve_segments_merge_five() {
        let chunks = merge_segments(&segments(12), 5);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start, 0.0);
        assert_eq!(chunks[0].end, 50.0);
        assert_eq!(chunks[1].start, 50.0);
        assert_eq!(chunks[1].end, 100.0);
        // Last group holds the remaining 2 segments.
        assert_eq!(chunks[2].start, 100.0);
        assert_eq!(chunks[2].end, 120.0);
        assert_eq!(chunks[2].text, "seg10 seg11");
    }

    #[test]
    fn test_concatenation_preserves_order() {
        let source = segments(12);
        let chunks = merge_segments(&source, 5);

        let rebuilt = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let original = source
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_merge_size_one_is_identity() {
        let source = segments(4);
        let chunks = merge_segments(&source, 1);

        assert_eq!(chunks.len(), 4);
        for (chunk, segment) in chunks.iter().zip(&source) {
            assert_eq!(chunk.start, segment.start);
            assert_eq!(chunk.end, segment.end);
            assert_eq!(chunk.text, segment.text);
        }
    }
}
