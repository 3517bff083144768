//! Post-specific domain rules.

use super::error::DomainError;

/// Number of leading characters shown when a post stands in for a title.
pub const DISPLAY_TITLE_CHARS: usize = 15;

/// Leading slice of the post text used wherever a post is listed by name.
///
/// Counts characters, not bytes, so multi-byte text never splits mid-glyph.
pub fn display_title(text: &str) -> String {
    text.chars().take(DISPLAY_TITLE_CHARS).collect()
}

/// Validate user-supplied post or comment text.
pub fn validate_text(text: &str) -> Result<(), DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::validation("text must not be empty"));
    }
    Ok(())
}
