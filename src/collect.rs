//! End-to-end collection pipeline: discover, infer, normalize, aggregate,
//! persist.
//!
//! Per-file failures never abort the run; they are recorded as skips with a
//! reason and the remaining files proceed. The run as a whole fails only
//! when nothing at all was collected.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::aggregate::aggregate;
use crate::config::{CollectorConfig, RunContext};
use crate::discover::discover;
use crate::errors::CollectError;
use crate::metadata::{self, ModelFamily};
use crate::normalize::{normalize, NormalizerOptions};
use crate::record::ResultRecord;
use crate::table::{load_tables, Table};
use crate::types::{PathString, Reason, SheetName};
use crate::workbook::{write_workbook, RunSummary};

/// Overall outcome of one collection run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionStatus {
    /// At least one record was collected and the workbook was written.
    Success,
    /// No result files were found, or none yielded records.
    Failed,
}

/// One file that was discovered but produced no records.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedFile {
    /// Path relative to the base directory.
    pub path: PathString,
    /// Why the file was skipped.
    pub reason: Reason,
}

/// Summary of one collection run.
#[derive(Clone, Debug)]
pub struct CollectionReport {
    /// Run outcome.
    pub status: CollectionStatus,
    /// Result files found by discovery.
    pub files_discovered: usize,
    /// Files that loaded successfully.
    pub files_parsed: usize,
    /// Files skipped, with reasons.
    pub skipped: Vec<SkippedFile>,
    /// Records written to the master sheet.
    pub record_count: usize,
    /// Distinct persisted asset labels.
    pub unique_assets: usize,
    /// Distinct persisted model labels.
    pub unique_models: usize,
    /// Distinct metric names.
    pub unique_metrics: usize,
    /// Where the workbook was written, when the run succeeded.
    pub output_path: Option<PathBuf>,
}

impl CollectionReport {
    /// True when the run collected records and persisted the workbook.
    pub fn is_success(&self) -> bool {
        self.status == CollectionStatus::Success
    }
}

/// Result-file loader signature, swappable in tests.
type Loader = fn(&Path) -> Result<Vec<(Option<SheetName>, Table)>, CollectError>;

/// The consolidation pipeline, configured once and run against a base dir.
#[derive(Clone, Debug)]
pub struct ResultsCollector {
    config: CollectorConfig,
    loader: Loader,
}

impl Default for ResultsCollector {
    fn default() -> Self {
        Self::new(CollectorConfig::default())
    }
}

impl ResultsCollector {
    /// Collector with an explicit configuration.
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            loader: load_tables,
        }
    }

    #[cfg(test)]
    fn with_loader(config: CollectorConfig, loader: Loader) -> Self {
        Self { config, loader }
    }

    /// Run the full pipeline under `base` and write the workbook.
    pub fn collect(
        &self,
        base: &Path,
        ctx: &RunContext,
    ) -> Result<CollectionReport, CollectError> {
        let files = discover(base, &self.config);
        info!(run_id = %ctx.run_id, count = files.len(), "discovered result files");
        if files.is_empty() {
            warn!("no result files found under the configured roots");
            return Ok(CollectionReport {
                status: CollectionStatus::Failed,
                files_discovered: 0,
                files_parsed: 0,
                skipped: Vec::new(),
                record_count: 0,
                unique_assets: 0,
                unique_models: 0,
                unique_metrics: 0,
                output_path: None,
            });
        }

        let options = NormalizerOptions {
            column_policy: self.config.column_policy,
            missing_values: self.config.missing_values,
        };
        let mut records: Vec<ResultRecord> = Vec::new();
        let mut skipped: Vec<SkippedFile> = Vec::new();
        let mut files_parsed = 0usize;

        for file in &files {
            let relative = relative_path(file, base);
            let tables = match load_with_timeout(file, self.config.per_file_timeout, self.loader)
            {
                Ok(tables) => tables,
                Err(err) => {
                    warn!(file = %relative, error = %err, "skipping unreadable result file");
                    skipped.push(SkippedFile {
                        path: relative,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            files_parsed += 1;

            let mut file_metadata = metadata::infer(&relative);
            // The digest probe needs the on-disk location, not the
            // provenance string.
            file_metadata.config_hash = metadata::config_hash_for(file);
            if relative.contains(&self.config.residuals_root) {
                file_metadata.synthetic_origin = true;
                file_metadata.model_family = Some(ModelFamily::NfGarch);
            }

            for (sheet, table) in &tables {
                records.extend(normalize(
                    table,
                    &file_metadata,
                    &relative,
                    sheet.as_deref(),
                    ctx,
                    &options,
                ));
            }
        }

        if records.is_empty() {
            warn!("no records collected from any result file");
            return Ok(CollectionReport {
                status: CollectionStatus::Failed,
                files_discovered: files.len(),
                files_parsed,
                skipped,
                record_count: 0,
                unique_assets: 0,
                unique_models: 0,
                unique_metrics: 0,
                output_path: None,
            });
        }

        let unique_assets = distinct(records.iter().map(ResultRecord::asset_label));
        let unique_models = distinct(records.iter().map(ResultRecord::model_label));
        let unique_metrics = distinct(records.iter().map(|record| record.metric.as_str()));

        let summaries = aggregate(&records);
        let output_path = base.join(&self.config.output_path);
        let run = RunSummary {
            run_id: ctx.run_id.clone(),
            generated_at: ctx.started_at,
            files_discovered: files.len(),
            files_parsed,
            files_skipped: skipped.len(),
            record_count: records.len(),
            unique_assets,
            unique_models,
            unique_metrics,
        };
        write_workbook(&output_path, &records, &summaries, &run)?;
        info!(
            records = records.len(),
            parsed = files_parsed,
            skipped = skipped.len(),
            "collection run complete"
        );

        Ok(CollectionReport {
            status: CollectionStatus::Success,
            files_discovered: files.len(),
            files_parsed,
            skipped,
            record_count: records.len(),
            unique_assets,
            unique_models,
            unique_metrics,
            output_path: Some(output_path),
        })
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.collect::<BTreeSet<_>>().len()
}

fn relative_path(file: &Path, base: &Path) -> String {
    file.strip_prefix(base)
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Load a result file on a worker thread, abandoning it on timeout.
///
/// The worker is detached; a hung parse leaks one thread instead of
/// stalling the run.
fn load_with_timeout(
    path: &Path,
    timeout: Duration,
    loader: Loader,
) -> Result<Vec<(Option<SheetName>, Table)>, CollectError> {
    let (sender, receiver) = mpsc::channel();
    let owned = path.to_path_buf();
    thread::spawn(move || {
        let _ = sender.send(loader(&owned));
    });
    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(CollectError::Parse {
            path: path.display().to_string(),
            reason: format!("parse timed out after {}s", timeout.as_secs()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::fs;
    use tempfile::tempdir;

    fn ctx() -> RunContext {
        RunContext::fixed(
            "run_test",
            Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 12).unwrap(),
        )
    }

    fn metrics_csv() -> String {
        let mut body = String::from("Asset,Model,MSE,MAE\n");
        for _ in 0..10 {
            body.push_str("AMZN,sGARCH_norm,0.01,0.005\n");
        }
        body
    }

    #[test]
    fn pipeline_collects_and_writes_the_workbook() {
        let temp = tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("outputs/model_eval")).unwrap();
        fs::write(base.join("outputs/model_eval/fit_metrics.csv"), metrics_csv()).unwrap();

        let report = ResultsCollector::default().collect(base, &ctx()).unwrap();
        assert!(report.is_success());
        assert_eq!(report.files_discovered, 1);
        assert_eq!(report.files_parsed, 1);
        assert!(report.skipped.is_empty());
        // 10 rows, 2 metric columns each.
        assert_eq!(report.record_count, 20);
        assert_eq!(report.unique_assets, 1);
        assert_eq!(report.unique_models, 1);
        assert_eq!(report.unique_metrics, 2);
        assert!(report.output_path.as_deref().unwrap().is_file());
    }

    #[test]
    fn unreadable_files_are_skipped_with_a_reason() {
        let temp = tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("outputs")).unwrap();
        fs::write(base.join("outputs/fit.csv"), metrics_csv()).unwrap();
        fs::write(
            base.join("outputs/broken.json"),
            format!("{{not json at all {}", " padding".repeat(20)),
        )
        .unwrap();

        let report = ResultsCollector::default().collect(base, &ctx()).unwrap();
        assert!(report.is_success());
        assert_eq!(report.files_discovered, 2);
        assert_eq!(report.files_parsed, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, "outputs/broken.json");
        assert!(report.skipped[0].reason.contains("failed to parse"));
    }

    #[test]
    fn empty_tables_are_not_counted_as_skipped() {
        let temp = tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("outputs")).unwrap();
        fs::write(base.join("outputs/fit.csv"), metrics_csv()).unwrap();
        // Header-only but above the size threshold.
        fs::write(
            base.join("outputs/empty.csv"),
            format!("Model,MSE,{}\n", "padding_column,".repeat(12)),
        )
        .unwrap();

        let report = ResultsCollector::default().collect(base, &ctx()).unwrap();
        assert_eq!(report.files_parsed, 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn residuals_files_force_the_nf_family() {
        let temp = tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("nf_generated_residuals")).unwrap();
        let mut body = String::from("residual\n");
        for value in 0..20 {
            body.push_str(&format!("0.{value}\n"));
        }
        fs::write(
            base.join("nf_generated_residuals/sGARCH_norm_equity_AMZN_residuals_synthetic.csv"),
            body,
        )
        .unwrap();

        let report = ResultsCollector::default().collect(base, &ctx()).unwrap();
        assert!(report.is_success());

        // Re-run the parse to inspect the records the workbook was built from.
        let config = CollectorConfig::default();
        let files = discover(base, &config);
        let relative = relative_path(&files[0], base);
        let mut file_metadata = metadata::infer(&relative);
        file_metadata.config_hash = metadata::config_hash_for(&files[0]);
        assert!(file_metadata.synthetic_origin);
        assert_eq!(file_metadata.model_family, Some(ModelFamily::NfGarch));
    }

    fn stalling_loader(
        path: &Path,
    ) -> Result<Vec<(Option<SheetName>, Table)>, CollectError> {
        if path.to_string_lossy().contains("slow") {
            thread::sleep(Duration::from_secs(2));
        }
        load_tables(path)
    }

    #[test]
    fn slow_parses_time_out_with_a_reason() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("slow.csv");
        fs::write(&path, metrics_csv()).unwrap();

        let err = load_with_timeout(&path, Duration::from_millis(20), stalling_loader)
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn timed_out_files_are_skipped_and_the_run_continues() {
        let temp = tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("outputs")).unwrap();
        fs::write(base.join("outputs/fit.csv"), metrics_csv()).unwrap();
        fs::write(base.join("outputs/slow_eval.csv"), metrics_csv()).unwrap();

        let config = CollectorConfig {
            per_file_timeout: Duration::from_millis(50),
            ..CollectorConfig::default()
        };
        let report = ResultsCollector::with_loader(config, stalling_loader)
            .collect(base, &ctx())
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.files_discovered, 2);
        assert_eq!(report.files_parsed, 1);
        assert_eq!(report.record_count, 20);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, "outputs/slow_eval.csv");
        assert!(report.skipped[0].reason.contains("timed out"));
    }

    #[test]
    fn empty_base_directory_fails_without_error() {
        let temp = tempdir().unwrap();
        let report = ResultsCollector::default().collect(temp.path(), &ctx()).unwrap();
        assert!(!report.is_success());
        assert_eq!(report.status, CollectionStatus::Failed);
        assert_eq!(report.output_path, None);
    }
}
