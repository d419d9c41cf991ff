// src/util.rs — String clipping for prompts and log lines

use std::borrow::Cow;

/// Longest prefix of `s` that fits in `max_len` bytes without splitting a
/// UTF-8 character.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Like [`truncate_str`], but marks the cut with the number of bytes dropped
/// so a model reading the excerpt knows it is partial.
pub fn excerpt(s: &str, max_len: usize) -> Cow<'_, str> {
    let kept = truncate_str(s, max_len);
    if kept.len() == s.len() {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!(
            "{}\n[... {} more bytes]",
            kept,
            s.len() - kept.len()
        ))
    }
}
