//! Deterministic local commentary used whenever no backend is configured
//! or the configured one fails. Pure function of the payload, never errors.

use medley_engine::payload::json_as_number;
use medley_engine::Payload;
use medley_format::format_grouped;
use std::fmt::Write as _;

const MAX_LABEL_CHARS: usize = 120;
const TOP_ROWS: usize = 3;

/// Builds a short, fully local commentary over the payload.
pub fn fallback_comment(payload: &Payload) -> String {
    if payload.rows.is_empty() {
        return "**TL;DR** The pivot came back empty, so there is nothing to \
                comment on. Loosen the grouping or check the source file."
            .to_string();
    }

    // First numeric column in display order carries the headline.
    let Some(metric) = payload
        .columns
        .iter()
        .find(|name| payload.numeric_summary.contains_key(name.as_str()))
    else {
        return "**TL;DR** This pivot holds no numeric metric. Add at least one \
                numeric value column to get a quantified summary."
            .to_string();
    };
    let summary = &payload.numeric_summary[metric];

    let mut out = String::new();
    let _ = writeln!(
        out,
        "**TL;DR** Across {} rows, {} totals {} (average {} per row).",
        payload.rows.len(),
        metric,
        format_grouped(summary.sum, 2),
        format_grouped(summary.mean, 2),
    );

    let top = top_rows(payload, metric);
    if !top.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Top rows by {metric}:");
        for (label, value) in top {
            let _ = writeln!(out, "- {label}: {}", format_grouped(value, 2));
        }
    }

    let _ = writeln!(out);
    let _ = write!(
        out,
        "Recommendation: review the leaders above against their share of the \
         total, and re-run with a narrower grouping to isolate what drives them."
    );
    out
}

/// Rows ranked by the metric, labeled with the non-numeric cells.
fn top_rows(payload: &Payload, metric: &str) -> Vec<(String, f64)> {
    let label_columns: Vec<&String> = payload
        .columns
        .iter()
        .filter(|name| !payload.numeric_summary.contains_key(name.as_str()))
        .collect();

    let mut ranked: Vec<(String, f64)> = payload
        .rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let value = row.get(metric).and_then(json_as_number)?;
            let mut label = label_columns
                .iter()
                .filter_map(|name| row.get(name.as_str()))
                .filter_map(|cell| match cell {
                    serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" | ");
            if label.is_empty() {
                label = format!("row {}", idx + 1);
            }
            if label.chars().count() > MAX_LABEL_CHARS {
                label = label.chars().take(MAX_LABEL_CHARS).collect();
            }
            Some((label, value))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(TOP_ROWS);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::payload_from;
    use serde_json::json;

    #[test]
    fn empty_payload_gets_the_fixed_no_data_message() {
        let payload = payload_from(&["Segment", "Clicks"], vec![]);
        let text = fallback_comment(&payload);
        assert!(text.starts_with("**TL;DR** The pivot came back empty"));
    }

    #[test]
    fn payload_without_metrics_gets_the_guidance_message() {
        let payload = payload_from(
            &["Segment"],
            vec![vec![json!("a")], vec![json!("b")]],
        );
        let text = fallback_comment(&payload);
        assert!(text.starts_with("**TL;DR** This pivot holds no numeric metric"));
    }

    #[test]
    fn headline_uses_the_first_numeric_column_in_display_order() {
        let payload = payload_from(
            &["Segment", "Spend", "Clicks"],
            vec![
                vec![json!("search"), json!(1500.0), json!(40.0)],
                vec![json!("social"), json!(500.0), json!(10.0)],
            ],
        );
        let text = fallback_comment(&payload);
        assert!(text.contains("Spend totals 2 000,00"));
        assert!(text.contains("average 1 000,00"));
        assert!(!text.contains("Clicks totals"));
    }

    #[test]
    fn top_rows_are_ranked_and_labeled() {
        let payload = payload_from(
            &["Channel", "Device", "Clicks"],
            vec![
                vec![json!("search"), json!("mobile"), json!(10.0)],
                vec![json!("social"), json!("desktop"), json!(30.0)],
                vec![json!("video"), json!("mobile"), json!(20.0)],
                vec![json!("audio"), json!("desktop"), json!(5.0)],
            ],
        );
        let text = fallback_comment(&payload);
        let social = text.find("social | desktop: 30,00").unwrap();
        let video = text.find("video | mobile: 20,00").unwrap();
        let search = text.find("search | mobile: 10,00").unwrap();
        assert!(social < video && video < search);
        assert!(!text.contains("audio"));
        assert!(text.contains("Recommendation:"));
    }
}
