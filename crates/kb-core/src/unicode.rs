//! Code-point helpers. Every offset exchanged with the engine and the text
//! surface is measured in code points.

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the `n`-th code point, clamped to the end of `s`.
pub fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

/// Apply a signed delta to a position, saturating at zero.
pub fn offset_position(position: usize, delta: i64) -> usize {
    if delta >= 0 {
        position.saturating_add(delta as usize)
    } else {
        position.saturating_sub(delta.unsigned_abs() as usize)
    }
}
