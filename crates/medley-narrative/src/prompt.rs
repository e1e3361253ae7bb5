//! Prompt assembly: shrink the payload to a bounded sample, then lay out
//! persona, instructions, data, and analysis as one text block.

use medley_engine::payload::ColumnSummary;
use medley_engine::{Analysis, Payload};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::{Audience, Depth, NarrativeOptions};

/// Rows kept from the start of the payload when sampling.
pub const HEAD_ROWS: usize = 25;
/// Rows kept from the end of the payload when sampling.
pub const TAIL_ROWS: usize = 10;
/// At most this many column names are listed in the prompt.
pub const MAX_LISTED_COLUMNS: usize = 60;

/// Payload view embedded in the prompt. Row and column counts in `shape`
/// keep reporting the full payload so the reader knows what was elided.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShrunkPayload {
    pub shape: medley_engine::payload::Shape,
    pub columns: Vec<String>,
    pub numeric_summary: BTreeMap<String, ColumnSummary>,
    pub rows: Vec<serde_json::Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Samples the payload down to the first [`HEAD_ROWS`] plus the last
/// [`TAIL_ROWS`] rows when it holds more than their sum, and caps the
/// listed column names at [`MAX_LISTED_COLUMNS`].
pub fn shrink_payload(payload: &Payload) -> ShrunkPayload {
    let total = payload.rows.len();
    let (rows, note) = if total > HEAD_ROWS + TAIL_ROWS {
        let mut rows: Vec<_> = payload.rows[..HEAD_ROWS].to_vec();
        rows.extend_from_slice(&payload.rows[total - TAIL_ROWS..]);
        (
            rows,
            Some(format!(
                "rows sampled: first {HEAD_ROWS} and last {TAIL_ROWS} of {total}"
            )),
        )
    } else {
        (payload.rows.clone(), None)
    };

    let mut columns = payload.columns.clone();
    let note = if columns.len() > MAX_LISTED_COLUMNS {
        columns.truncate(MAX_LISTED_COLUMNS);
        let trimmed = format!(
            "columns listed: first {MAX_LISTED_COLUMNS} of {}",
            payload.columns.len()
        );
        Some(match note {
            Some(existing) => format!("{existing}; {trimmed}"),
            None => trimmed,
        })
    } else {
        note
    };

    ShrunkPayload {
        shape: payload.shape,
        columns,
        numeric_summary: payload.numeric_summary.clone(),
        rows,
        note,
    }
}

fn persona(audience: Audience) -> &'static str {
    match audience {
        Audience::MediaExpert => {
            "You are a senior media analyst. You read campaign pivots daily and \
             call out delivery, efficiency, and pacing issues with precise figures."
        }
        Audience::Executive => {
            "You write for an executive reader. Lead with the business outcome, \
             keep jargon out, and make every number earn its place."
        }
        Audience::MarketingStrategist => {
            "You advise a marketing strategist. Connect the numbers to audience, \
             channel mix, and next-step experiments."
        }
    }
}

fn depth_instruction(depth: Depth) -> &'static str {
    match depth {
        Depth::Deep => {
            "Go deep: cover the distribution, the outliers, and at least three \
             concrete recommendations."
        }
        Depth::Standard => "Cover the headline findings and two recommendations.",
        Depth::Brief => "Keep it to a short paragraph: one finding, one recommendation.",
    }
}

fn pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Assembles the full prompt sent to a narrative backend.
pub fn build_prompt(payload: &Payload, analysis: &Analysis, options: &NarrativeOptions) -> String {
    let sample = shrink_payload(payload);

    let mut prompt = String::new();
    let _ = writeln!(prompt, "{}", persona(options.audience));
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Write the commentary in the language with code \"{}\".",
        options.language
    );
    let _ = writeln!(prompt, "{}", depth_instruction(options.depth));
    let _ = writeln!(
        prompt,
        "Ground every claim in the data below; never invent figures. \
         Start with a **TL;DR** line, then findings, then recommendations."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "## Pivot data");
    let _ = writeln!(prompt, "{}", pretty_json(&sample));
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "## Computed analysis");
    let _ = writeln!(prompt, "{}", pretty_json(analysis));
    prompt
}
