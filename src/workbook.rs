//! Consolidated-results workbook persistence.
//!
//! The sentinel labels (`All_Assets`, `Summary`, `Unknown`, `all`) appear
//! here and nowhere else: in-memory records keep `Option` fields and the
//! substitution happens at the write boundary.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::aggregate::{GroupStats, Summaries};
use crate::constants::workbook::{
    MASTER_COLUMNS, SHEET_MASTER, SHEET_METADATA, SHEET_SUMMARY_BY_ASSET_MODEL,
    SHEET_SUMMARY_BY_MODEL, SHEET_WINRATES,
};
use crate::errors::CollectError;
use crate::record::ResultRecord;
use crate::types::RunId;

impl From<XlsxError> for CollectError {
    fn from(err: XlsxError) -> Self {
        Self::Workbook(err.to_string())
    }
}

/// Run-level facts persisted on the metadata sheet.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Batch identity of the collection run.
    pub run_id: RunId,
    /// When the workbook was generated.
    pub generated_at: DateTime<Utc>,
    /// Result files found by discovery.
    pub files_discovered: usize,
    /// Files that loaded successfully.
    pub files_parsed: usize,
    /// Files skipped with a recorded reason.
    pub files_skipped: usize,
    /// Total records on the master sheet.
    pub record_count: usize,
    /// Distinct persisted asset labels.
    pub unique_assets: usize,
    /// Distinct persisted model labels.
    pub unique_models: usize,
    /// Distinct metric names.
    pub unique_metrics: usize,
}

/// Write the full consolidated workbook to `path`.
///
/// Parent directories are created as needed. Every sheet is written even
/// when empty so downstream readers can rely on the sheet set.
pub fn write_workbook(
    path: &Path,
    records: &[ResultRecord],
    summaries: &Summaries,
    run: &RunSummary,
) -> Result<(), CollectError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut workbook = Workbook::new();
    write_master_sheet(workbook.add_worksheet(), records)?;
    write_model_summary_sheet(workbook.add_worksheet(), summaries)?;
    write_asset_model_summary_sheet(workbook.add_worksheet(), summaries)?;
    write_winrates_sheet(workbook.add_worksheet(), summaries)?;
    write_metadata_sheet(workbook.add_worksheet(), run)?;
    workbook.save(path)?;

    info!(
        path = %path.display(),
        records = records.len(),
        "wrote consolidated workbook"
    );
    Ok(())
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    for (column, header) in headers.iter().enumerate() {
        sheet.write_string(0, column as u16, *header)?;
    }
    Ok(())
}

fn write_master_sheet(sheet: &mut Worksheet, records: &[ResultRecord]) -> Result<(), XlsxError> {
    sheet.set_name(SHEET_MASTER)?;
    write_headers(sheet, &MASTER_COLUMNS)?;
    for (index, record) in records.iter().enumerate() {
        let row = (index + 1) as u32;
        sheet.write_string(row, 0, record.asset_label())?;
        sheet.write_string(row, 1, record.model_label())?;
        sheet.write_string(row, 2, record.model_family.as_str())?;
        sheet.write_string(row, 3, record.split_type.as_str())?;
        sheet.write_string(row, 4, record.fold.to_string())?;
        sheet.write_string(row, 5, &record.metric)?;
        if let Some(value) = record.value {
            sheet.write_number(row, 6, value)?;
        }
        sheet.write_string(row, 7, &record.run_id)?;
        sheet.write_string(row, 8, record.timestamp.to_rfc3339())?;
        sheet.write_string(row, 9, &record.source_file)?;
        sheet.write_string(row, 10, record.sheet_name.as_deref().unwrap_or(""))?;
        sheet.write_number(row, 11, record.row_index as f64)?;
        sheet.write_string(row, 12, record.asset_type.as_str())?;
        sheet.write_string(row, 13, record.config_hash.as_deref().unwrap_or(""))?;
    }
    Ok(())
}

fn write_stats(
    sheet: &mut Worksheet,
    row: u32,
    first_column: u16,
    stats: &GroupStats,
) -> Result<(), XlsxError> {
    let optionals = [stats.mean, stats.std, stats.min, stats.max];
    for (offset, value) in optionals.iter().enumerate() {
        if let Some(value) = value {
            sheet.write_number(row, first_column + offset as u16, *value)?;
        }
    }
    sheet.write_number(row, first_column + 4, stats.count as f64)?;
    Ok(())
}

fn write_model_summary_sheet(sheet: &mut Worksheet, summaries: &Summaries) -> Result<(), XlsxError> {
    sheet.set_name(SHEET_SUMMARY_BY_MODEL)?;
    write_headers(
        sheet,
        &["model", "metric", "mean", "std", "min", "max", "count"],
    )?;
    for (index, row_data) in summaries.by_model.iter().enumerate() {
        let row = (index + 1) as u32;
        sheet.write_string(row, 0, &row_data.model)?;
        sheet.write_string(row, 1, &row_data.metric)?;
        write_stats(sheet, row, 2, &row_data.stats)?;
    }
    Ok(())
}

fn write_asset_model_summary_sheet(
    sheet: &mut Worksheet,
    summaries: &Summaries,
) -> Result<(), XlsxError> {
    sheet.set_name(SHEET_SUMMARY_BY_ASSET_MODEL)?;
    write_headers(
        sheet,
        &["asset", "model", "metric", "mean", "std", "min", "max", "count"],
    )?;
    for (index, row_data) in summaries.by_asset_model.iter().enumerate() {
        let row = (index + 1) as u32;
        sheet.write_string(row, 0, &row_data.asset)?;
        sheet.write_string(row, 1, &row_data.model)?;
        sheet.write_string(row, 2, &row_data.metric)?;
        write_stats(sheet, row, 3, &row_data.stats)?;
    }
    Ok(())
}

fn write_winrates_sheet(sheet: &mut Worksheet, summaries: &Summaries) -> Result<(), XlsxError> {
    sheet.set_name(SHEET_WINRATES)?;
    write_headers(sheet, &["metric", "nf_count", "garch_count"])?;
    for (index, row_data) in summaries.winrates.iter().enumerate() {
        let row = (index + 1) as u32;
        sheet.write_string(row, 0, &row_data.metric)?;
        sheet.write_number(row, 1, row_data.nf_count as f64)?;
        sheet.write_number(row, 2, row_data.garch_count as f64)?;
    }
    Ok(())
}

fn write_metadata_sheet(sheet: &mut Worksheet, run: &RunSummary) -> Result<(), XlsxError> {
    sheet.set_name(SHEET_METADATA)?;
    write_headers(sheet, &["key", "value"])?;
    let numeric_rows = [
        ("files_discovered", run.files_discovered),
        ("files_parsed", run.files_parsed),
        ("files_skipped", run.files_skipped),
        ("record_count", run.record_count),
        ("unique_assets", run.unique_assets),
        ("unique_models", run.unique_models),
        ("unique_metrics", run.unique_metrics),
    ];
    sheet.write_string(1, 0, "run_id")?;
    sheet.write_string(1, 1, &run.run_id)?;
    sheet.write_string(2, 0, "generated_at")?;
    sheet.write_string(2, 1, run.generated_at.to_rfc3339())?;
    for (offset, (key, value)) in numeric_rows.iter().enumerate() {
        let row = (offset + 3) as u32;
        sheet.write_string(row, 0, *key)?;
        sheet.write_number(row, 1, *value as f64)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::config::RunContext;
    use crate::metadata::{AssetType, Fold, ModelFamily, SplitType};
    use calamine::{open_workbook_auto, Data, Reader};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn sample_records() -> Vec<ResultRecord> {
        let ctx = RunContext::fixed(
            "run_test",
            Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 12).unwrap(),
        );
        vec![
            ResultRecord {
                asset: Some("AMZN".to_string()),
                model: Some("sGARCH_norm".to_string()),
                model_family: ModelFamily::Garch,
                split_type: SplitType::Chrono,
                fold: Fold::All,
                metric: "MSE".to_string(),
                value: Some(0.0123),
                source_file: "outputs/fit.csv".to_string(),
                sheet_name: None,
                row_index: 0,
                run_id: ctx.run_id.clone(),
                timestamp: ctx.started_at,
                asset_type: AssetType::Equity,
                config_hash: Some("ab12cd34".to_string()),
            },
            ResultRecord {
                asset: None,
                model: None,
                model_family: ModelFamily::NfGarch,
                split_type: SplitType::Tscv,
                fold: Fold::Index(2),
                metric: "MSE".to_string(),
                value: None,
                source_file: "results/summary.xlsx".to_string(),
                sheet_name: Some("Sheet1".to_string()),
                row_index: 4,
                run_id: ctx.run_id,
                timestamp: ctx.started_at,
                asset_type: AssetType::Unknown,
                config_hash: None,
            },
        ]
    }

    #[test]
    fn workbook_round_trips_sheets_and_sentinels() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("artifacts/results_consolidated.xlsx");
        let records = sample_records();
        let summaries = aggregate(&records);
        let run = RunSummary {
            run_id: "run_test".to_string(),
            generated_at: Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 12).unwrap(),
            files_discovered: 2,
            files_parsed: 2,
            files_skipped: 0,
            record_count: records.len(),
            unique_assets: 2,
            unique_models: 2,
            unique_metrics: 1,
        };

        write_workbook(&path, &records, &summaries, &run).unwrap();

        let mut reopened = open_workbook_auto(&path).unwrap();
        assert_eq!(
            reopened.sheet_names(),
            vec![
                SHEET_MASTER,
                SHEET_SUMMARY_BY_MODEL,
                SHEET_SUMMARY_BY_ASSET_MODEL,
                SHEET_WINRATES,
                SHEET_METADATA,
            ]
        );

        let master = reopened.worksheet_range(SHEET_MASTER).unwrap();
        // Header plus two data rows.
        assert_eq!(master.height(), 3);
        assert_eq!(
            master.get_value((0, 0)),
            Some(&Data::String("asset".to_string()))
        );
        assert_eq!(
            master.get_value((1, 0)),
            Some(&Data::String("AMZN".to_string()))
        );
        assert_eq!(master.get_value((1, 6)), Some(&Data::Float(0.0123)));
        // Sentinels only appear in persisted output.
        assert_eq!(
            master.get_value((2, 0)),
            Some(&Data::String("All_Assets".to_string()))
        );
        assert_eq!(
            master.get_value((2, 1)),
            Some(&Data::String("Summary".to_string()))
        );
        // A null value stays an empty cell, not a zero.
        assert!(!matches!(master.get_value((2, 6)), Some(Data::Float(_))));
    }

    #[test]
    fn metadata_sheet_carries_run_counts() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("out.xlsx");
        let run = RunSummary {
            run_id: "run_test".to_string(),
            generated_at: Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 12).unwrap(),
            files_discovered: 7,
            files_parsed: 5,
            files_skipped: 2,
            record_count: 0,
            unique_assets: 0,
            unique_models: 0,
            unique_metrics: 0,
        };
        write_workbook(&path, &[], &Summaries::default(), &run).unwrap();

        let mut reopened = open_workbook_auto(&path).unwrap();
        let metadata = reopened.worksheet_range(SHEET_METADATA).unwrap();
        assert_eq!(
            metadata.get_value((1, 1)),
            Some(&Data::String("run_test".to_string()))
        );
        assert_eq!(metadata.get_value((3, 1)), Some(&Data::Float(7.0)));
        assert_eq!(metadata.get_value((5, 1)), Some(&Data::Float(2.0)));
    }
}
