//! Grounding prompt construction.

use crate::store::ChunkRecord;
use serde::Serialize;

/// System prompt for the teaching assistant persona.
pub const SYSTEM_PROMPT: &str = "You are a helpful teaching assistant.";

/// The compact chunk row embedded in the grounding prompt.
#[derive(Serialize)]
struct ContextRow<'a> {
    title: &'a str,
    #[serde(rename = "Number")]
    number: &'a str,
    start: f64,
    end: f64,
    text: &'a str,
}

/// Build the grounding prompt from the top retrieved chunks.
///
/// Embeds the chunk rows as structured JSON, the literal question, and the
/// instruction to answer only course-related questions without special
/// formatting characters.
pub fn build_grounding_prompt(question: &str, rows: &[&ChunkRecord], course_name: &str) -> String {
    let compact_rows: Vec<ContextRow> = rows
        .iter()
        .map(|row| ContextRow {
            title: &row.title,
            number: &row.number,
            start: row.start,
            end: row.end,
            text: &row.text,
        })
        .collect();

    let context = serde_json::to_string(&compact_rows).unwrap_or_else(|_| "[]".to_string());

    format!(
        "I am teaching the course {course_name}. Here are subtitle chunks containing video \
title, video number, start time in seconds, end time in seconds, and text:\n\
\n\
{context}\n\
\n\
-------------------------------------------------------------\n\
{question}\n\
\n\
User asked this question related to the video chunks.\n\
Answer where and how much content is taught, in which video and at what timestamp.\n\
If the question is unrelated, say you can only answer course-related questions. \
Also try not to use special characters like * in your answer."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> ChunkRecord {
        ChunkRecord {
            title: "Intro".to_string(),
            number: "1".to_string(),
            start: 0.0,
            end: 50.0,
            text: text.to_string(),
            chunk_id: 0,
            embedding: Vec::new(),
        }
    }

    #[test]
    fn test_prompt_embeds_context_and_question() {
        let chunk = record("HTML is the skeleton of a page");
        let prompt = build_grounding_prompt("What is HTML?", &[&chunk], "Web Dev 101");

        assert!(prompt.contains("Web Dev 101"));
        assert!(prompt.contains("What is HTML?"));
        assert!(prompt.contains("HTML is the skeleton of a page"));
        assert!(prompt.contains(r#""Number":"1""#));
        assert!(prompt.contains("only answer course-related questions"));
    }

    #[test]
    fn test_prompt_rows_exclude_embeddings() {
        let chunk = record("text");
        let prompt = build_grounding_prompt("q", &[&chunk], "c");
        assert!(!prompt.contains("embedding"));
        assert!(!prompt.contains("chunk_id"));
    }
}
