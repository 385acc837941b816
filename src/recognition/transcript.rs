//! Transcript clean-up applied to raw recogniser output

/// Some recognisers hand back a bare newline when the user says "enter"
const BARE_NEWLINE: &str = "\n";

/// Normalise a raw transcript. Returns `None` when nothing was recognised.
pub fn normalize(raw: &str) -> Option<String> {
    if raw == BARE_NEWLINE {
        return Some("enter".to_string());
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
