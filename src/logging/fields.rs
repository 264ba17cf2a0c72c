//! Field helpers for structured logging

/// Characters of a question kept in log previews.
pub const PREVIEW_CHARS: usize = 100;

/// Privacy-safe preview of an end-user question.
///
/// Returns `None` unless question logging is enabled; otherwise the first
/// [`PREVIEW_CHARS`] characters with newlines flattened.
///
/// # Examples
///
/// ```
/// use lumi::logging::question_preview;
///
/// assert_eq!(question_preview("Are you open?", false), None);
/// assert_eq!(question_preview("Are you\nopen?", true).as_deref(), Some("Are you open?"));
/// ```
pub fn question_preview(question: &str, enabled: bool) -> Option<String> {
    if !enabled {
        return None;
    }

    let flattened: String = question
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let flattened = flattened.trim();
    if flattened.is_empty() {
        return None;
    }

    if flattened.chars().count() > PREVIEW_CHARS {
        let preview: String = flattened.chars().take(PREVIEW_CHARS).collect();
        Some(format!("{}...", preview))
    } else {
        Some(flattened.to_string())
    }
}
