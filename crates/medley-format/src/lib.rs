//! Display formatting for numbers and tables headed to a UI or terminal.
//!
//! Three styles are offered: grouped separators (`1 234,56`), compact
//! (`1.2k` / `3.4M` / `5.6B`), and raw. Columns detected as percentages
//! (rate-like names, or values mostly inside `[0, 1]`) render as `x.xx%`
//! in every style.

use medley_model::Scalar;
use serde::{Deserialize, Serialize};

/// How numeric cells should be rendered for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberStyle {
    /// Grouped thousands with a decimal comma: `1 234,56`.
    #[default]
    Separators,
    /// Compact suffixes: `1.2k`, `3.4M`, `5.6B`.
    Compact,
    /// Plain `Display` output.
    Raw,
}

/// Formats with a space thousands separator and a decimal comma.
pub fn format_grouped(n: f64, decimals: usize) -> String {
    if n.is_nan() {
        return String::new();
    }
    let formatted = format!("{n:.decimals$}");
    let (sign, digits) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    let offset = int_part.len() % 3;
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (idx + 3 - offset) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped},{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Formats with `k` / `M` / `B` suffixes.
pub fn format_compact(n: f64, decimals: usize) -> String {
    if n.is_nan() {
        return String::new();
    }
    for (threshold, unit) in [(1e9, "B"), (1e6, "M"), (1e3, "k")] {
        if n.abs() >= threshold {
            return format!("{:.decimals$}{unit}", n / threshold);
        }
    }
    format!("{n:.decimals$}")
}

fn format_percent(n: f64, style: NumberStyle) -> String {
    let scaled = n * 100.0;
    match style {
        NumberStyle::Raw => format!("{scaled:.2}%"),
        _ => format!("{}%", format_grouped(scaled, 2)),
    }
}

/// Detects whether a column holds rates stored as fractions of 1.
///
/// A column qualifies when its name looks like a click-rate (`CTR`), or
/// when at least 80% of its numeric values fall inside `[0, 1]`.
pub fn is_percent_column(name: &str, values: &[Scalar]) -> bool {
    if name.to_ascii_lowercase().contains("ctr") {
        return true;
    }
    let numeric: Vec<f64> = values.iter().filter_map(Scalar::as_number).collect();
    if numeric.is_empty() {
        return false;
    }
    let in_unit = numeric.iter().filter(|v| (0.0..=1.0).contains(*v)).count();
    in_unit as f64 / numeric.len() as f64 >= 0.8
}

/// Renders one cell under the chosen style. Blanks and text pass through.
pub fn format_cell(value: &Scalar, style: NumberStyle, percent: bool) -> String {
    match value {
        Scalar::Number(n) => {
            let x = n.0;
            if percent {
                return format_percent(x, style);
            }
            match style {
                NumberStyle::Separators => format_grouped(x, 2),
                NumberStyle::Compact => format_compact(x, 2),
                NumberStyle::Raw => format!("{x}"),
            }
        }
        other => other.display_string(),
    }
}

/// Renders a grid of cells column by column, applying percent detection
/// per column.
pub fn format_grid(headers: &[String], rows: &[Vec<Scalar>], style: NumberStyle) -> Vec<Vec<String>> {
    let percent_flags: Vec<bool> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let column: Vec<Scalar> = rows.iter().map(|row| row[idx].clone()).collect();
            is_percent_column(name, &column)
        })
        .collect();

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&percent_flags)
                .map(|(cell, percent)| format_cell(cell, style, *percent))
                .collect()
        })
        .collect()
}
