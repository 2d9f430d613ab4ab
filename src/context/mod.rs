//! Prompt-ready rendering of retrieved food facts.


use serde_json::Value;

use crate::ingest::UNKNOWN_NAME;
use crate::nutrients::NUTRIENTS;
use crate::retrieval::RetrievedChunk;
use crate::store::Metadata;

pub const CONTEXT_HEADER: &str = "Relevant food facts:";

const GROUNDING_PREAMBLE: &str = "Use the food facts below when they are relevant to the user's question. \
Prefer these values over general knowledge, and say so when a food is not listed.";

/// Metadata value as display text. Null, empty strings and nested values
/// count as absent.
fn display_value(metadata: &Metadata, key: &str) -> Option<String> {
    match metadata.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn bullet(chunk: &RetrievedChunk) -> String {
    let name =
        display_value(&chunk.metadata, "name").unwrap_or_else(|| UNKNOWN_NAME.to_string());

    let attrs: Vec<String> = NUTRIENTS
        .iter()
        .filter_map(|nutrient| {
            display_value(&chunk.metadata, nutrient.key).map(|value| nutrient.describe(&value))
        })
        .collect();

    if attrs.is_empty() {
        format!("- {}", name)
    } else {
        format!("- {} ({})", name, attrs.join(", "))
    }
}

/// Render chunks as a bulleted block under [`CONTEXT_HEADER`], one bullet per
/// chunk in the given order. No chunks renders as an empty string.
#[inline]
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    std::iter::once(CONTEXT_HEADER.to_string())
        .chain(chunks.iter().map(bullet))
        .collect::<Vec<_>>()
        .join("\n")
}

/// System-role message asking the model to ground its answer in the
/// retrieved facts, or `None` when there is nothing to ground on.
#[inline]
pub fn grounding_instruction(chunks: &[RetrievedChunk]) -> Option<String> {
    let context = format_context(chunks);
    (!context.is_empty()).then(|| format!("{}\n\n{}", GROUNDING_PREAMBLE, context))
}
