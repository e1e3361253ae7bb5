//! Locale-tolerant numeric normalization.
//!
//! Media exports frequently format numbers the French way (`1 234,56`, with
//! a non-breaking space as the thousands separator). Normalization strips
//! both space variants, maps the decimal comma to a point, then parses.
//! Anything that still fails to parse becomes a blank, never an error.

use crate::Scalar;

/// Parses locale-formatted numeric text. Returns `None` for anything that
/// is not a number after normalization.
pub fn parse_locale_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != '\u{00A0}' && *c != ' ')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Normalizes one cell to `Number` or `Blank`.
///
/// Numbers pass through unchanged, which makes normalization idempotent.
pub fn normalize_scalar(value: &Scalar) -> Scalar {
    match value {
        Scalar::Number(_) => value.clone(),
        Scalar::Text(s) => match parse_locale_number(s) {
            Some(n) => Scalar::number(n),
            None => Scalar::Blank,
        },
        Scalar::Blank => Scalar::Blank,
    }
}

/// Normalizes a whole column.
pub fn normalize_column(values: &[Scalar]) -> Vec<Scalar> {
    values.iter().map(normalize_scalar).collect()
}
