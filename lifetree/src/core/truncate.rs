//! Truncation policy for over-length collaborator text.
//!
//! Applied before storage, never at export time, so stored and exported
//! text are always identical. Over-budget summaries keep their first and
//! last sentence around a fixed elision marker.

/// Fixed marker inserted where text was elided.
pub const ELISION_MARKER: &str = "[...]";

/// Truncate `text` to roughly `budget` characters.
///
/// Under-budget text is returned unchanged (modulo trim). Multi-sentence
/// text keeps the first and last sentence joined by the marker; a single
/// over-long sentence is cut at a character boundary with a trailing marker.
pub fn truncate_summary(text: &str, budget: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= budget {
        return text.to_string();
    }

    let sentences = split_sentences(text);
    if sentences.len() >= 2 {
        let first = sentences.first().expect("non-empty");
        let last = sentences.last().expect("non-empty");
        let elided = format!("{first} {ELISION_MARKER} {last}");
        if elided.chars().count() <= budget.max(ELISION_MARKER.len()) {
            return elided;
        }
        // Even first + last overflow the budget; fall through to a hard cut.
    }

    hard_cut(text, budget)
}

fn hard_cut(text: &str, budget: usize) -> String {
    let keep = budget.saturating_sub(ELISION_MARKER.len() + 1);
    let cut: String = text.chars().take(keep).collect();
    format!("{} {ELISION_MARKER}", cut.trim_end())
}

/// Split on sentence-ending punctuation, keeping the terminator.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}
