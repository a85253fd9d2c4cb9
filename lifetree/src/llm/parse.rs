//! Tolerant parsing of collaborator output.
//!
//! Models are asked for bare JSON but routinely wrap it in code fences or
//! prose. Parsing strips fences, locates the outermost JSON value of the
//! expected kind, and only then hands it to serde. Anything else is an
//! error for the engine's retry/degrade policy to handle.

use anyhow::{Context, Result, anyhow};

use crate::llm::RawAnnotation;

/// Parse a flat JSON array of strings (branch summaries).
pub fn parse_summaries(raw: &str) -> Result<Vec<String>> {
    let slice = locate(strip_fences(raw), '[', ']')
        .ok_or_else(|| anyhow!("no JSON array in collaborator output"))?;
    let summaries: Vec<String> =
        serde_json::from_str(slice).context("parse summaries as JSON array of strings")?;
    Ok(summaries)
}

/// Parse a flat JSON object with `risk`/`growth`/`emotion` keys.
pub fn parse_annotation(raw: &str) -> Result<RawAnnotation> {
    let slice = locate(strip_fences(raw), '{', '}')
        .ok_or_else(|| anyhow!("no JSON object in collaborator output"))?;
    let annotation: RawAnnotation =
        serde_json::from_str(slice).context("parse annotation object")?;
    Ok(annotation)
}

/// Drop markdown code fences, keeping their body.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the opening fence line.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Slice from the first `open` to the last `close`, inclusive.
fn locate(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..end + close.len_utf8()])
}
