//! Bidirectional reordering
//!
//! Labels are stored in logical order; the glyph pass draws left to right,
//! so right-to-left runs are reordered into visual order first.

use unicode_bidi::BidiInfo;

use crate::{Result, TextError};

/// Longest input accepted for reordering
pub const MAX_BIDI_CHARS: usize = 1_000_000;

/// Reorder `text` from logical into visual order.
///
/// The paragraph direction is detected from the first strong character.
/// Inputs over [`MAX_BIDI_CHARS`] characters are rejected.
pub fn visual_order(text: &str) -> Result<String> {
    let len = text.chars().count();
    if len > MAX_BIDI_CHARS {
        tracing::error!("bidi reordering of {} characters refused", len);
        return Err(TextError::TextTooLong(len));
    }

    let info = BidiInfo::new(text, None);
    if !info.has_rtl() {
        return Ok(text.to_owned());
    }

    let mut visual = String::with_capacity(text.len());
    for paragraph in &info.paragraphs {
        let line = paragraph.range.clone();
        visual.push_str(&info.reorder_line(paragraph, line));
    }
    Ok(visual)
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
