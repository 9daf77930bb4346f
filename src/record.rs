use chrono::{DateTime, Utc};

use crate::constants::sentinels;
use crate::metadata::{AssetType, Fold, ModelFamily, SplitType};
use crate::types::{AssetName, MetricName, ModelName, PathString, RunId, SheetName};

/// Canonical long-format unit: one (row, metric) observation.
///
/// Asset and model stay optional in memory; the `All_Assets`/`Summary`
/// sentinels exist only in persisted output for schema compatibility.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRecord {
    /// Asset the observation applies to, when attributable.
    pub asset: Option<AssetName>,
    /// Model identifier as it appears in source data, when attributable.
    pub model: Option<ModelName>,
    /// Family recomputed from the row model, unless the source path forces
    /// NF-GARCH.
    pub model_family: ModelFamily,
    /// Split methodology inferred for the source file.
    pub split_type: SplitType,
    /// Fold index inferred for the source file.
    pub fold: Fold,
    /// Normalized metric name.
    pub metric: MetricName,
    /// Metric value; `None` when the source cell was missing or unparseable.
    pub value: Option<f64>,
    /// Source file path, required provenance.
    pub source_file: PathString,
    /// Sheet the row came from, for workbook sources.
    pub sheet_name: Option<SheetName>,
    /// Zero-based data-row index within the source table.
    pub row_index: usize,
    /// Batch identity of the collection run.
    pub run_id: RunId,
    /// Collection-run timestamp.
    pub timestamp: DateTime<Utc>,
    /// Asset class derived from the asset name.
    pub asset_type: AssetType,
    /// Truncated digest of the adjacent config file, when present.
    pub config_hash: Option<String>,
}

impl ResultRecord {
    /// Persisted asset label, substituting the `All_Assets` sentinel.
    pub fn asset_label(&self) -> &str {
        self.asset.as_deref().unwrap_or(sentinels::ALL_ASSETS)
    }

    /// Persisted model label, substituting the `Summary` sentinel.
    pub fn model_label(&self) -> &str {
        self.model.as_deref().unwrap_or(sentinels::SUMMARY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(asset: Option<&str>, model: Option<&str>) -> ResultRecord {
        ResultRecord {
            asset: asset.map(|a| a.to_string()),
            model: model.map(|m| m.to_string()),
            model_family: ModelFamily::Garch,
            split_type: SplitType::Chrono,
            fold: Fold::All,
            metric: "MSE".to_string(),
            value: Some(0.01),
            source_file: "outputs/x.csv".to_string(),
            sheet_name: None,
            row_index: 0,
            run_id: "run_test".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 12).unwrap(),
            asset_type: AssetType::Equity,
            config_hash: None,
        }
    }

    #[test]
    fn sentinels_appear_only_through_labels() {
        let attributed = record(Some("AMZN"), Some("sGARCH"));
        assert_eq!(attributed.asset_label(), "AMZN");
        assert_eq!(attributed.model_label(), "sGARCH");

        let unattributed = record(None, None);
        assert_eq!(unattributed.asset, None);
        assert_eq!(unattributed.asset_label(), "All_Assets");
        assert_eq!(unattributed.model_label(), "Summary");
    }
}
