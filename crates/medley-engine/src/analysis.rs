//! Analysis engine: derives weighted ratios, dispersion, ranking, and
//! data-quality checks from a payload so any generated narrative is grounded
//! in real aggregates instead of hallucinated ones.
//!
//! Weighted ratios are always computed from aggregate sums, never from the
//! arithmetic mean of per-row ratios, which would distort mixed-weight data
//! (Simpson's paradox).

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::Payload;

/// Canonical media-metric columns recognized by keyword inference. Absent
/// metrics are `None`, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredMetrics {
    pub impressions: Option<String>,
    pub clicks: Option<String>,
    pub ctr: Option<String>,
    pub spend: Option<String>,
    pub cpc: Option<String>,
    pub cpm: Option<String>,
    /// Column driving ranking and dispersion, by priority
    /// spend > clicks > impressions > ctr > cpc > cpm, falling back to the
    /// first column holding at least one numeric value.
    pub primary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedRatios {
    pub ctr_weighted: Option<f64>,
    pub cpc_weighted: Option<f64>,
    pub cpm_weighted: Option<f64>,
    pub clicks_sum: Option<f64>,
    pub impressions_sum: Option<f64>,
    pub spend_sum: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispersion {
    pub metric: Option<String>,
    /// Population standard deviation over the primary metric.
    pub std: Option<f64>,
    /// 75th minus 25th percentile, linear interpolation.
    pub iqr: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Top/bottom rows by the primary metric. `bottom` lists the five lowest
/// rows worst-first (ascending by the metric).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub metric: Option<String>,
    pub top: Vec<serde_json::Map<String, Value>>,
    pub bottom: Vec<serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    /// Set when the stated click-rate column disagrees with the implied
    /// clicks/impressions ratio by more than 2 percentage points on average.
    pub ctr_vs_ratio_warning: bool,
    pub ctr_vs_ratio_avg_abs_diff: Option<f64>,
    /// Which of Impressions / Clicks / Spend are structurally absent.
    pub missing_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub inferred_metrics: InferredMetrics,
    pub weighted: WeightedRatios,
    pub dispersion_on_primary: Dispersion,
    pub ranking_on_primary: Ranking,
    pub data_quality: DataQuality,
}

const RANK_SIZE: usize = 5;
const CTR_TOLERANCE: f64 = 0.02;

struct MetricPatterns {
    impressions: Regex,
    clicks: Regex,
    ctr: Regex,
    spend: Regex,
    cpc: Regex,
    cpm: Regex,
}

fn keyword_regex(candidates: &[&str]) -> Regex {
    let alternation = candidates
        .iter()
        .map(|c| regex::escape(c))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .build()
        .expect("static metric keyword pattern")
}

fn patterns() -> &'static MetricPatterns {
    static PATTERNS: OnceLock<MetricPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| MetricPatterns {
        impressions: keyword_regex(&["Impressions", "Impr", "Imps"]),
        clicks: keyword_regex(&["Clicks", "Click", "Clics"]),
        ctr: keyword_regex(&["CTR", "Click-Through Rate"]),
        spend: keyword_regex(&["Spend", "Cost", "Dépense", "Budget"]),
        cpc: keyword_regex(&["CPC"]),
        cpm: keyword_regex(&["CPM"]),
    })
}

fn find_column(columns: &[String], pattern: &Regex) -> Option<String> {
    columns.iter().find(|c| pattern.is_match(c)).cloned()
}

fn infer_metrics(payload: &Payload) -> InferredMetrics {
    let pats = patterns();
    let cols = &payload.columns;
    let mut metrics = InferredMetrics {
        impressions: find_column(cols, &pats.impressions),
        clicks: find_column(cols, &pats.clicks),
        ctr: find_column(cols, &pats.ctr),
        spend: find_column(cols, &pats.spend),
        cpc: find_column(cols, &pats.cpc),
        cpm: find_column(cols, &pats.cpm),
        primary: None,
    };

    metrics.primary = [
        &metrics.spend,
        &metrics.clicks,
        &metrics.impressions,
        &metrics.ctr,
        &metrics.cpc,
        &metrics.cpm,
    ]
    .into_iter()
    .find_map(|m| m.clone())
    .or_else(|| {
        cols.iter()
            .find(|c| payload.column_numbers(c).iter().any(Option::is_some))
            .cloned()
    });

    metrics
}

fn nansum(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().sum()
}

fn has_any(values: &[Option<f64>]) -> bool {
    values.iter().any(Option::is_some)
}

/// Linear-interpolation percentile over already-sorted values.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let weight = rank - lo as f64;
    sorted[lo] * (1.0 - weight) + sorted[hi] * weight
}

fn dispersion(payload: &Payload, primary: &Option<String>) -> Dispersion {
    let Some(metric) = primary else {
        return Dispersion::default();
    };
    let mut values: Vec<f64> = payload
        .column_numbers(metric)
        .into_iter()
        .flatten()
        .collect();
    if values.is_empty() {
        return Dispersion {
            metric: Some(metric.clone()),
            ..Dispersion::default()
        };
    }
    values.sort_by(f64::total_cmp);
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Dispersion {
        metric: Some(metric.clone()),
        std: Some(variance.sqrt()),
        iqr: Some(percentile(&values, 75.0) - percentile(&values, 25.0)),
        min: Some(values[0]),
        max: Some(values[values.len() - 1]),
    }
}

fn ranking(payload: &Payload, primary: &Option<String>) -> Ranking {
    let Some(metric) = primary else {
        return Ranking::default();
    };
    let mut ranked: Vec<(f64, &serde_json::Map<String, Value>)> = payload
        .rows
        .iter()
        .zip(payload.column_numbers(metric))
        .map(|(row, value)| (value.unwrap_or(f64::NEG_INFINITY), row))
        .collect();
    // Stable descending sort keeps payload order as the tiebreak.
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let top = ranked
        .iter()
        .take(RANK_SIZE)
        .map(|(_, row)| (*row).clone())
        .collect();
    let bottom = ranked
        .iter()
        .rev()
        .take(RANK_SIZE)
        .map(|(_, row)| (*row).clone())
        .collect();
    Ranking {
        metric: Some(metric.clone()),
        top,
        bottom,
    }
}

fn data_quality(payload: &Payload, metrics: &InferredMetrics) -> DataQuality {
    let mut quality = DataQuality::default();

    if let (Some(ctr_col), Some(clicks_col), Some(impr_col)) =
        (&metrics.ctr, &metrics.clicks, &metrics.impressions)
    {
        let stated = payload.column_numbers(ctr_col);
        let clicks = payload.column_numbers(clicks_col);
        let impressions = payload.column_numbers(impr_col);
        let mut diffs: Vec<f64> = Vec::new();
        for ((stated, clicks), impressions) in stated.iter().zip(&clicks).zip(&impressions) {
            let implied = match (clicks, impressions) {
                (Some(c), Some(i)) if *i != 0.0 => Some(c / i),
                _ => None,
            };
            if let (Some(stated), Some(implied)) = (stated, implied) {
                diffs.push((implied - stated).abs());
            }
        }
        if !diffs.is_empty() {
            let avg = diffs.iter().sum::<f64>() / diffs.len() as f64;
            quality.ctr_vs_ratio_avg_abs_diff = Some(avg);
            quality.ctr_vs_ratio_warning = avg > CTR_TOLERANCE;
        }
    }

    for (metric, label) in [
        (&metrics.impressions, "Impressions"),
        (&metrics.clicks, "Clicks"),
        (&metrics.spend, "Spend"),
    ] {
        if metric.is_none() {
            quality.missing_columns.push(label.to_string());
        }
    }

    quality
}

/// Computes the full analysis result. Absent metrics surface as `None` /
/// empty sections; this never fails.
pub fn analyze(payload: &Payload) -> Analysis {
    let metrics = infer_metrics(payload);

    let impressions = metrics.impressions.as_ref().map(|c| payload.column_numbers(c));
    let clicks = metrics.clicks.as_ref().map(|c| payload.column_numbers(c));
    let spend = metrics.spend.as_ref().map(|c| payload.column_numbers(c));

    let mut weighted = WeightedRatios::default();
    if let (Some(impressions), Some(clicks)) = (&impressions, &clicks) {
        if has_any(impressions) {
            let impressions_sum = nansum(impressions);
            let clicks_sum = nansum(clicks);
            weighted.ctr_weighted = (impressions_sum > 0.0).then(|| clicks_sum / impressions_sum);
            weighted.clicks_sum = Some(clicks_sum);
            weighted.impressions_sum = Some(impressions_sum);
        }
    }
    if let (Some(spend), Some(clicks)) = (&spend, &clicks) {
        if has_any(clicks) {
            let spend_sum = nansum(spend);
            let clicks_sum = nansum(clicks);
            weighted.cpc_weighted = (clicks_sum > 0.0).then(|| spend_sum / clicks_sum);
            weighted.spend_sum = Some(spend_sum);
            weighted.clicks_sum = Some(clicks_sum);
        }
    }
    if let (Some(spend), Some(impressions)) = (&spend, &impressions) {
        if has_any(impressions) {
            let spend_sum = nansum(spend);
            let impressions_sum = nansum(impressions);
            weighted.cpm_weighted =
                (impressions_sum > 0.0).then(|| spend_sum / impressions_sum * 1000.0);
            weighted.spend_sum = Some(spend_sum);
            weighted.impressions_sum = Some(impressions_sum);
        }
    }

    Analysis {
        dispersion_on_primary: dispersion(payload, &metrics.primary),
        ranking_on_primary: ranking(payload, &metrics.primary),
        data_quality: data_quality(payload, &metrics),
        weighted,
        inferred_metrics: metrics,
    }
}
