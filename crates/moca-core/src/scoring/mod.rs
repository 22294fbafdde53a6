//! Deterministic scorers, one per task family.
//!
//! Every function here is pure: the same submission (and, for orientation,
//! the same date) always yields the same results.

pub mod examiner;
pub mod memory;
pub mod naming;
pub mod orientation;
pub mod recall;

/// Lowercase, trim, and strip Spanish diacritics (ñ is kept).
pub fn normalize_answer(s: &str) -> String {
    s.trim().to_lowercase().chars().map(fold_accent).collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        other => other,
    }
}

/// Uppercase word tokens of free text, split on whitespace and punctuation.
pub fn tokenize_upper(s: &str) -> Vec<String> {
    s.split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '-'))
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_uppercase)
        .collect()
}
