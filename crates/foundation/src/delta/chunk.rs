//! Chunk-level diff for prose
//!
//! Prose rarely changes line-by-line the way code does; paragraphs move as
//! units. Text is split on blank lines and greedily re-packed into chunks
//! bounded by a size cap, then compared positionally.

use serde_json::{json, Value};

/// How much of a replaced chunk's old text the payload carries
const OLD_PREVIEW_CHARS: usize = 50;

/// Split text into paragraph-sized chunks no larger than `max_chunk`
/// characters (a single oversized paragraph stays whole; packing never
/// splits inside a paragraph).
pub(crate) fn split_chunks(text: &str, max_chunk: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        if current.is_empty() {
            current.push_str(paragraph);
        } else if current.len() + 2 + paragraph.len() <= max_chunk {
            current.push_str("\n\n");
            current.push_str(paragraph);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(paragraph);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Positional chunk comparison. Changed chunks carry a truncated preview of
/// the old text; chunks appended past the old count carry `old: null`.
pub(crate) fn chunk_changes(old_chunks: &[String], new_chunks: &[String]) -> Vec<Value> {
    let mut changes = Vec::new();

    for (position, new_chunk) in new_chunks.iter().enumerate() {
        match old_chunks.get(position) {
            Some(old_chunk) if old_chunk != new_chunk => changes.push(json!({
                "position": position,
                "old": preview(old_chunk),
                "new": new_chunk,
            })),
            Some(_) => {}
            None => changes.push(json!({
                "position": position,
                "old": Value::Null,
                "new": new_chunk,
            })),
        }
    }
    changes
}

fn preview(text: &str) -> String {
    if text.chars().count() <= OLD_PREVIEW_CHARS {
        text.to_string()
    } else {
        text.chars().take(OLD_PREVIEW_CHARS).collect()
    }
}
