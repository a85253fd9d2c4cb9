//! Normalization of collaborator-returned annotation labels.
//!
//! The collaborator is free text underneath; labels outside the fixed
//! per-dimension vocabularies are mapped by nearest match (case-insensitive
//! exact, then unambiguous prefix) and fall back to `Unknown` rather than
//! rejecting the node.

use crate::llm::RawAnnotation;
use crate::tree::{Annotation, Level};

const LEVELS: [(Level, &str); 3] = [
    (Level::Low, "low"),
    (Level::Medium, "medium"),
    (Level::High, "high"),
];

/// Canonical emotional-tone vocabulary.
pub const EMOTIONS: [&str; 12] = [
    "Hopeful",
    "Anxious",
    "Torn",
    "Regretful",
    "Energized",
    "Pragmatic",
    "Adventurous",
    "Cautious",
    "Optimistic",
    "Ambitious",
    "Curious",
    "Determined",
];

/// Normalize a raw annotation into the fixed tag shape.
pub fn normalize(raw: &RawAnnotation) -> Annotation {
    Annotation {
        risk: normalize_level(&raw.risk),
        growth: normalize_level(&raw.growth),
        emotion: normalize_emotion(&raw.emotion),
    }
}

/// Map a free-text level label onto `{Low, Medium, High}`, else `Unknown`.
pub fn normalize_level(label: &str) -> Level {
    let needle = label.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Level::Unknown;
    }
    for (level, canonical) in LEVELS {
        if needle == canonical {
            return level;
        }
    }
    let mut prefix_hit = None;
    for (level, canonical) in LEVELS {
        if canonical.starts_with(&needle) {
            if prefix_hit.is_some() {
                return Level::Unknown;
            }
            prefix_hit = Some(level);
        }
    }
    prefix_hit.unwrap_or(Level::Unknown)
}

/// Map a free-text emotion label onto the canonical vocabulary, else
/// `"Unknown"`.
pub fn normalize_emotion(label: &str) -> String {
    let needle = label.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return "Unknown".to_string();
    }
    for canonical in EMOTIONS {
        if needle == canonical.to_ascii_lowercase() {
            return canonical.to_string();
        }
    }
    let mut prefix_hit = None;
    for canonical in EMOTIONS {
        if canonical.to_ascii_lowercase().starts_with(&needle) {
            if prefix_hit.is_some() {
                return "Unknown".to_string();
            }
            prefix_hit = Some(canonical);
        }
    }
    prefix_hit.unwrap_or("Unknown").to_string()
}
