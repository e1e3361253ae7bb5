use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Scalar value held by table cells and pivot group keys.
///
/// This is the canonical serde format used across the engine / payload / CLI
/// boundaries: a tagged enum in the shape `{ "type": "...", "value": ... }`.
///
/// Equality and ordering are total so scalars can serve directly as grouping
/// keys: all NaNs are one key, `-0.0` and `0.0` are one key, and the
/// cross-type order is numbers, then text (case-insensitive), then blanks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Scalar {
    Number(OrderedFloat<f64>),
    Text(String),
    Blank,
}

impl Scalar {
    /// Builds a numeric scalar with a canonical bit pattern.
    ///
    /// `0.0` and `-0.0` are treated as the same key, and all NaN payloads
    /// collapse to one NaN so a pivot never emits multiple distinct
    /// "NaN" groups.
    pub fn number(n: f64) -> Self {
        if n == 0.0 {
            return Scalar::Number(OrderedFloat(0.0));
        }
        if n.is_nan() {
            return Scalar::Number(OrderedFloat(f64::NAN));
        }
        Scalar::Number(OrderedFloat(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Scalar::Text(s.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(n.0),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Blank)
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Scalar::Number(_) => 0,
            Scalar::Text(_) => 1,
            Scalar::Blank => 2,
        }
    }

    /// Display-oriented string (not a stable serialization). Blanks render
    /// as the empty string.
    pub fn display_string(&self) -> String {
        match self {
            Scalar::Blank => String::new(),
            Scalar::Number(n) => {
                let x = n.0;
                if x.is_nan() {
                    "NaN".to_string()
                } else {
                    format!("{x}")
                }
            }
            Scalar::Text(s) => s.clone(),
        }
    }
}

fn cmp_text_case_insensitive(a: &str, b: &str) -> Ordering {
    let mut a_iter = a.chars().flat_map(|c| c.to_uppercase());
    let mut b_iter = b.chars().flat_map(|c| c.to_uppercase());
    loop {
        match (a_iter.next(), b_iter.next()) {
            (Some(ac), Some(bc)) => match ac.cmp(&bc) {
                Ordering::Equal => continue,
                ord => return ord,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank_cmp = self.kind_rank().cmp(&other.kind_rank());
        if rank_cmp != Ordering::Equal {
            return rank_cmp;
        }
        match (self, other) {
            (Scalar::Number(a), Scalar::Number(b)) => a.0.total_cmp(&b.0),
            (Scalar::Text(a), Scalar::Text(b)) => {
                // Text sorts case-insensitively, with a deterministic
                // case-sensitive tiebreak so the ordering stays total.
                let ord = cmp_text_case_insensitive(a, b);
                if ord != Ordering::Equal {
                    ord
                } else {
                    a.cmp(b)
                }
            }
            (Scalar::Blank, Scalar::Blank) => Ordering::Equal,
            _ => Ordering::Equal,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::number(value as f64)
    }
}

/// Ordered tuple of grouping values keying one pivot row.
///
/// The tuple has one entry per row-group level; hierarchical keys are plain
/// sequences, with no dataframe-style multi-level index behind them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey(pub Vec<Scalar>);

impl RowKey {
    pub fn display_strings(&self) -> Vec<String> {
        self.0.iter().map(Scalar::display_string).collect()
    }
}
