//! Char-boundary-safe slicing and sentence-boundary trimming.

/// Number of `char`s in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

/// The first `n` chars of `s`.
pub fn head(s: &str, n: usize) -> &str {
    &s[..byte_offset(s, n)]
}

/// The last `n` chars of `s`.
pub fn tail(s: &str, n: usize) -> &str {
    let total = char_len(s);
    if n >= total {
        return s;
    }
    &s[byte_offset(s, total - n)..]
}

/// Cut `s` just after its last period when that period sits past `threshold` chars.
pub fn cut_after_last_period(s: &str, threshold: f64) -> &str {
    match s.rfind('.') {
        Some(idx) if char_len(&s[..idx]) as f64 > threshold => &s[..idx + 1],
        _ => s,
    }
}

/// Drop everything through the first period when it sits before `limit` chars
/// (and is not the very first char).
pub fn skip_through_first_period(s: &str, limit: f64) -> &str {
    match s.find('.') {
        Some(idx) if idx > 0 && (char_len(&s[..idx]) as f64) < limit => &s[idx + 1..],
        _ => s,
    }
}
