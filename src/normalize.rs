//! Text normalization and tokenization.
//!
//! Everything the index stores and everything a query matches against
//! passes through [`normalize`] first, so the two sides always agree on
//! case and (optionally) diacritics.

use unicode_normalization::UnicodeNormalization;

/// Normalize a string for search: lowercase, and optionally fold
/// diacritics.
///
/// With `preserve_diacritics = false` the string is NFD-decomposed and all
/// combining marks are stripped, which lets ASCII queries hit accented
/// text:
/// - "Café" → "cafe"
/// - "naïve" → "naive"
///
/// Everything else — whitespace, emoji, CJK, RTL scripts — passes through
/// untouched. Idempotent: normalizing twice equals normalizing once.
pub fn normalize(value: &str, preserve_diacritics: bool) -> String {
    if preserve_diacritics {
        value.to_lowercase()
    } else {
        value
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .collect::<String>()
            .to_lowercase()
    }
}

/// Check if a character is a combining mark (diacritic).
///
/// Covers the common combining diacritical mark blocks; base letters in
/// non-Latin scripts are untouched.
fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}' |  // Combining Diacritical Marks
        '\u{1AB0}'..='\u{1AFF}' |  // Combining Diacritical Marks Extended
        '\u{1DC0}'..='\u{1DFF}' |  // Combining Diacritical Marks Supplement
        '\u{20D0}'..='\u{20FF}' |  // Combining Diacritical Marks for Symbols
        '\u{FE20}'..='\u{FE2F}'    // Combining Half Marks
    )
}

/// Tokenize normalized text into the maximal alphanumeric runs.
///
/// Tokens are runs of Unicode Letter/Number characters, in document order.
pub fn tokenize(text: &str, preserve_diacritics: bool) -> Vec<String> {
    tokenize_with_offsets(text, preserve_diacritics)
        .into_iter()
        .map(|(token, _)| token)
        .collect()
}

/// Tokenize into (token, char offset) pairs.
///
/// Offsets are character positions in the *normalized* text, which is the
/// coordinate space postings and match spans use.
pub fn tokenize_with_offsets(text: &str, preserve_diacritics: bool) -> Vec<(String, usize)> {
    let normalized = normalize(text, preserve_diacritics);
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;

    for (i, c) in normalized.chars().enumerate() {
        if c.is_alphanumeric() {
            if current.is_empty() {
                start = i;
            }
            current.push(c);
        } else if !current.is_empty() {
            tokens.push((std::mem::take(&mut current), start));
        }
    }
    if !current.is_empty() {
        tokens.push((current, start));
    }

    tokens
}
