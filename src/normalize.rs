//! Table-to-record normalization.
//!
//! Turns one loaded table into long-format records: one record per
//! (row, metric column) pair, with row-level asset/model values taking
//! priority over file-level inferred metadata.

use tracing::debug;

use crate::config::RunContext;
use crate::constants::vocab::{
    ASSET_COLUMN_ALIASES, HIGHER_IS_BETTER, LOWER_IS_BETTER, METRIC_INDICATORS,
    MODEL_COLUMN_ALIASES,
};
use crate::metadata::{AssetType, FileMetadata, ModelFamily};
use crate::record::ResultRecord;
use crate::table::{Cell, Table};
use crate::types::MetricName;

/// Column classification strategy for unknown columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// Any non-key column counts as a metric, vocabulary match or not.
    #[default]
    Permissive,
    /// Only vocabulary matches count as metrics.
    Strict,
}

/// Handling of missing (blank/NaN) metric cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingValuePolicy {
    /// Emit a record with `value = None`, keeping the row auditable.
    #[default]
    Retain,
    /// Drop the cell entirely, emitting no record.
    Drop,
}

/// Normalizer switches.
#[derive(Clone, Copy, Debug, Default)]
pub struct NormalizerOptions {
    /// Unknown-column handling.
    pub column_policy: ColumnPolicy,
    /// Missing-cell handling.
    pub missing_values: MissingValuePolicy,
}

/// Whether a metric improves when it goes up or down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricPolarity {
    /// Error-style metrics.
    LowerIsBetter,
    /// Fit/accuracy-style metrics.
    HigherIsBetter,
}

/// Classify a metric name's polarity, defaulting to lower-is-better.
pub fn metric_polarity(metric: &str) -> MetricPolarity {
    let lower = metric.to_lowercase();
    if LOWER_IS_BETTER.iter().any(|keyword| lower.contains(keyword)) {
        MetricPolarity::LowerIsBetter
    } else if HIGHER_IS_BETTER.iter().any(|keyword| lower.contains(keyword)) {
        MetricPolarity::HigherIsBetter
    } else {
        MetricPolarity::LowerIsBetter
    }
}

/// Canonical metric spellings, matched case- and punctuation-insensitively.
const METRIC_CANONICAL: [(&str, &str); 17] = [
    ("loglik", "LogLikelihood"),
    ("log_likelihood", "LogLikelihood"),
    ("loglikelihood", "LogLikelihood"),
    ("aic", "AIC"),
    ("bic", "BIC"),
    ("mse", "MSE"),
    ("mae", "MAE"),
    ("mape", "MAPE"),
    ("rmse", "RMSE"),
    ("r_squared", "R_Squared"),
    ("r2", "R_Squared"),
    ("correlation", "Correlation"),
    ("win_rate", "Win_Rate"),
    ("violation_rate", "Violation_Rate"),
    ("p_value", "P_Value"),
    ("qstat", "QStat"),
    ("archlm_pval", "ARCHLM_PValue"),
];

fn fold_metric_key(name: &str) -> String {
    name.to_lowercase().replace(['_', '-'], "")
}

/// Map a raw column name onto its canonical metric spelling.
///
/// Unmatched names pass through unchanged.
pub fn normalize_metric_name(name: &str) -> MetricName {
    let folded = fold_metric_key(name);
    METRIC_CANONICAL
        .iter()
        .find(|(key, _)| fold_metric_key(key) == folded)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Trim a column name and replace inner spaces with underscores.
pub fn clean_column_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}

fn find_key_column(columns: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| columns.iter().position(|column| column == alias))
}

fn is_reserved_column(name: &str) -> bool {
    ASSET_COLUMN_ALIASES.contains(&name)
        || MODEL_COLUMN_ALIASES.contains(&name)
        || name.eq_ignore_ascii_case("index")
}

/// Classify columns into metric columns under the given policy.
pub fn metric_column_indices(
    columns: &[String],
    key_columns: &[Option<usize>],
    policy: ColumnPolicy,
) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .filter(|(index, name)| {
            if key_columns.contains(&Some(*index)) {
                return false;
            }
            let lower = name.to_lowercase();
            let vocabulary_match = METRIC_INDICATORS
                .iter()
                .any(|indicator| lower.contains(indicator));
            match policy {
                ColumnPolicy::Strict => vocabulary_match,
                ColumnPolicy::Permissive => vocabulary_match || !is_reserved_column(name),
            }
        })
        .map(|(index, _)| index)
        .collect()
}

fn row_key_value(table: &Table, row: usize, column: Option<usize>) -> Option<String> {
    let cell = table.cell(row, column?);
    if cell.is_missing() {
        None
    } else {
        Some(cell.to_string())
    }
}

/// Normalize one table into long-format records.
///
/// An empty table yields no records and is not an error. Missing metric
/// cells follow `options.missing_values`; present-but-unparseable cells
/// always emit a record with `value = None`.
pub fn normalize(
    table: &Table,
    metadata: &FileMetadata,
    source_file: &str,
    sheet_name: Option<&str>,
    ctx: &RunContext,
    options: &NormalizerOptions,
) -> Vec<ResultRecord> {
    if table.is_empty() {
        return Vec::new();
    }

    let columns: Vec<String> = table.columns.iter().map(|c| clean_column_name(c)).collect();
    let asset_column = find_key_column(&columns, &ASSET_COLUMN_ALIASES);
    let model_column = find_key_column(&columns, &MODEL_COLUMN_ALIASES);
    let metric_columns =
        metric_column_indices(&columns, &[asset_column, model_column], options.column_policy);
    debug!(
        source = source_file,
        metrics = metric_columns.len(),
        "classified metric columns"
    );

    let mut records = Vec::new();
    for row in 0..table.rows.len() {
        let asset = row_key_value(table, row, asset_column).or_else(|| metadata.asset.clone());
        let model = row_key_value(table, row, model_column).or_else(|| metadata.model.clone());

        // Path-level override first, then the row's own model name, then
        // whatever the file path suggested.
        let model_family = if metadata.synthetic_origin {
            ModelFamily::NfGarch
        } else {
            match model.as_deref() {
                Some(name) => ModelFamily::from_model_name(name),
                None => metadata.model_family.unwrap_or(ModelFamily::Garch),
            }
        };
        let asset_type = AssetType::from_asset(asset.as_deref());

        for &column in &metric_columns {
            let cell = table.cell(row, column);
            if cell.is_missing() && options.missing_values == MissingValuePolicy::Drop {
                continue;
            }
            records.push(ResultRecord {
                asset: asset.clone(),
                model: model.clone(),
                model_family,
                split_type: metadata.split_type,
                fold: metadata.fold,
                metric: normalize_metric_name(&columns[column]),
                value: cell.as_number(),
                source_file: source_file.to_string(),
                sheet_name: sheet_name.map(|name| name.to_string()),
                row_index: row,
                run_id: ctx.run_id.clone(),
                timestamp: ctx.started_at,
                asset_type,
                config_hash: metadata.config_hash.clone(),
            });
        }
    }
    records
}
