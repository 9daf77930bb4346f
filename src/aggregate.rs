//! Grouped summary tables over the normalized record stream.
//!
//! Grouping is commutative and associative over the input, so record order
//! (and any upstream parallelism) never changes the output: groups are
//! emitted in sorted key order.

use std::collections::BTreeMap;

use crate::metadata::ModelFamily;
use crate::record::ResultRecord;
use crate::types::{AssetName, MetricName, ModelName};

/// Descriptive statistics for one group of metric values.
///
/// Statistics cover value-bearing records only; records with a null value
/// keep the group alive but do not contribute. `std` is the sample standard
/// deviation (n-1 denominator) and is `None` below two values.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupStats {
    /// Arithmetic mean, `None` for all-null groups.
    pub mean: Option<f64>,
    /// Sample standard deviation, `None` below two values.
    pub std: Option<f64>,
    /// Minimum value.
    pub min: Option<f64>,
    /// Maximum value.
    pub max: Option<f64>,
    /// Count of value-bearing records.
    pub count: usize,
}

impl GroupStats {
    fn from_values(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                mean: None,
                std: None,
                min: None,
                max: None,
                count: 0,
            };
        }
        let sum: f64 = values.iter().sum();
        let mean = sum / count as f64;
        let std = if count > 1 {
            let squared: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            Some((squared / (count - 1) as f64).sqrt())
        } else {
            None
        };
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Self {
            mean: Some(mean),
            std,
            min: Some(min),
            max: Some(max),
            count,
        }
    }
}

/// One (model, metric) summary row.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSummaryRow {
    /// Model label (persisted sentinel form).
    pub model: ModelName,
    /// Metric name.
    pub metric: MetricName,
    /// Group statistics.
    pub stats: GroupStats,
}

/// One (asset, model, metric) summary row.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetModelSummaryRow {
    /// Asset label (persisted sentinel form).
    pub asset: AssetName,
    /// Model label (persisted sentinel form).
    pub model: ModelName,
    /// Metric name.
    pub metric: MetricName,
    /// Group statistics.
    pub stats: GroupStats,
}

/// Best-effort NF-GARCH vs GARCH comparison row for one metric.
///
/// No common join key is guaranteed across the two families in source data,
/// so this summarizes value-bearing record counts rather than a paired test.
#[derive(Clone, Debug, PartialEq)]
pub struct WinrateRow {
    /// Metric present in at least one family.
    pub metric: MetricName,
    /// Value-bearing NF-GARCH records for this metric.
    pub nf_count: usize,
    /// Value-bearing GARCH records for this metric.
    pub garch_count: usize,
}

/// All derived summary tables for one collection run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summaries {
    /// Grouped by (model, metric).
    pub by_model: Vec<ModelSummaryRow>,
    /// Grouped by (asset, model, metric).
    pub by_asset_model: Vec<AssetModelSummaryRow>,
    /// Per-metric family comparison; empty unless both families are present.
    pub winrates: Vec<WinrateRow>,
}

/// Build all summary tables from the full record stream.
pub fn aggregate(records: &[ResultRecord]) -> Summaries {
    let mut by_model: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    let mut by_asset_model: BTreeMap<(String, String, String), Vec<f64>> = BTreeMap::new();

    for record in records {
        let model = record.model_label().to_string();
        let asset = record.asset_label().to_string();
        let model_values = by_model
            .entry((model.clone(), record.metric.clone()))
            .or_default();
        let asset_values = by_asset_model
            .entry((asset, model, record.metric.clone()))
            .or_default();
        if let Some(value) = record.value {
            model_values.push(value);
            asset_values.push(value);
        }
    }

    Summaries {
        by_model: by_model
            .into_iter()
            .map(|((model, metric), values)| ModelSummaryRow {
                model,
                metric,
                stats: GroupStats::from_values(&values),
            })
            .collect(),
        by_asset_model: by_asset_model
            .into_iter()
            .map(|((asset, model, metric), values)| AssetModelSummaryRow {
                asset,
                model,
                metric,
                stats: GroupStats::from_values(&values),
            })
            .collect(),
        winrates: winrates(records),
    }
}

fn winrates(records: &[ResultRecord]) -> Vec<WinrateRow> {
    let mut nf_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut garch_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        if record.value.is_none() {
            continue;
        }
        let counts = match record.model_family {
            ModelFamily::NfGarch => &mut nf_counts,
            ModelFamily::Garch => &mut garch_counts,
        };
        *counts.entry(record.metric.as_str()).or_default() += 1;
    }
    if nf_counts.is_empty() || garch_counts.is_empty() {
        return Vec::new();
    }

    let mut metrics: Vec<&str> = nf_counts.keys().chain(garch_counts.keys()).copied().collect();
    metrics.sort_unstable();
    metrics.dedup();
    metrics
        .into_iter()
        .map(|metric| WinrateRow {
            metric: metric.to_string(),
            nf_count: nf_counts.get(metric).copied().unwrap_or(0),
            garch_count: garch_counts.get(metric).copied().unwrap_or(0),
        })
        .collect()
}
