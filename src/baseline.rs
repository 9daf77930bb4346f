//! Regression verification against a frozen baseline.
//!
//! Comparison is per scalar: numeric values within a relative tolerance
//! (absolute near zero), everything else by exact string equality. A shape
//! mismatch is reported once per table and never aborts the remaining
//! sheets or files.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::constants::baseline::{DEFAULT_TOLERANCE, NEAR_ZERO_THRESHOLD};
use crate::errors::CollectError;
use crate::table::{load_tables, Cell, Table};
use crate::types::{Location, SheetName};

/// Outcome of a comparison run: pass/fail plus every violation found.
#[derive(Clone, Debug, Default)]
pub struct ComparisonReport {
    /// Human-readable failure list; empty means the comparison passed.
    pub failures: Vec<String>,
}

impl ComparisonReport {
    /// True when no violations were found.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report's failures into this one.
    pub fn merge(&mut self, other: ComparisonReport) {
        self.failures.extend(other.failures);
    }
}

/// Frozen baseline, either a single table or a whole workbook.
#[derive(Clone, Debug)]
pub enum BaselineData {
    /// Single-table baseline (CSV).
    Table(Table),
    /// Multi-sheet baseline keyed by sheet name.
    Workbook(Vec<(SheetName, Table)>),
}

/// Load the baseline file, failing hard when it is missing or unreadable.
pub fn load_baseline(path: &Path) -> Result<BaselineData, CollectError> {
    if !path.is_file() {
        return Err(CollectError::MissingInput(format!(
            "baseline file '{}' does not exist",
            path.display()
        )));
    }
    let tables = load_tables(path)?;
    let is_workbook = tables.iter().any(|(sheet, _)| sheet.is_some());
    if is_workbook {
        Ok(BaselineData::Workbook(
            tables
                .into_iter()
                .map(|(sheet, table)| (sheet.unwrap_or_default(), table))
                .collect(),
        ))
    } else {
        let (_, table) = tables
            .into_iter()
            .next()
            .ok_or_else(|| CollectError::MissingInput("baseline file is empty".to_string()))?;
        Ok(BaselineData::Table(table))
    }
}

/// True when `current` is within tolerance of `baseline`.
///
/// Near-zero baselines (|baseline| < 1e-10) switch to an absolute-difference
/// check because a relative difference against ~0 is meaningless.
pub fn numeric_within_tolerance(current: f64, baseline: f64, tolerance: f64) -> bool {
    if baseline.abs() < NEAR_ZERO_THRESHOLD {
        (current - baseline).abs() <= tolerance
    } else {
        ((current - baseline) / baseline).abs() <= tolerance
    }
}

/// Failure-message label for one cell, `label.column[row]`.
fn cell_location(label: &str, column: &str, row: usize) -> Location {
    if label.is_empty() {
        format!("{column}[{row}]")
    } else {
        format!("{label}.{column}[{row}]")
    }
}

/// Per-scalar comparator with a configurable numeric tolerance.
#[derive(Clone, Copy, Debug)]
pub struct BaselineComparator {
    tolerance: f64,
}

impl Default for BaselineComparator {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl BaselineComparator {
    /// Comparator with an explicit tolerance.
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Compare one cell pair, appending any violation to `failures`.
    pub fn compare_cells(
        &self,
        current: &Cell,
        baseline: &Cell,
        location: &str,
        failures: &mut Vec<String>,
    ) {
        match (current.is_missing(), baseline.is_missing()) {
            (true, true) => return,
            (true, false) | (false, true) => {
                failures.push(format!(
                    "{location}: missing-value mismatch (current='{current}', baseline='{baseline}')"
                ));
                return;
            }
            (false, false) => {}
        }
        match (current.as_number(), baseline.as_number()) {
            (Some(current_value), Some(baseline_value)) => {
                if !numeric_within_tolerance(current_value, baseline_value, self.tolerance) {
                    if baseline_value.abs() < NEAR_ZERO_THRESHOLD {
                        failures.push(format!(
                            "{location}: near-zero mismatch (current={current_value}, baseline={baseline_value})"
                        ));
                    } else {
                        let relative =
                            ((current_value - baseline_value) / baseline_value).abs();
                        failures.push(format!(
                            "{location}: relative difference {relative:.2e} exceeds tolerance {:.2e}",
                            self.tolerance
                        ));
                    }
                }
            }
            _ => {
                let current_text = current.to_string();
                let baseline_text = baseline.to_string();
                if current_text != baseline_text {
                    failures.push(format!(
                        "{location}: string mismatch (current='{current_text}', baseline='{baseline_text}')"
                    ));
                }
            }
        }
    }

    /// Compare two tables cell by cell.
    ///
    /// A row/column-count or column-name mismatch is one failure and skips
    /// the cell loop for this table only.
    pub fn compare_tables(
        &self,
        current: &Table,
        baseline: &Table,
        label: &str,
    ) -> ComparisonReport {
        let mut report = ComparisonReport::default();
        if current.shape() != baseline.shape() {
            report.failures.push(format!(
                "{label}: shape mismatch (current {:?} vs baseline {:?})",
                current.shape(),
                baseline.shape()
            ));
            return report;
        }
        if current.columns != baseline.columns {
            report.failures.push(format!(
                "{label}: column mismatch (current {:?} vs baseline {:?})",
                current.columns, baseline.columns
            ));
            return report;
        }
        for (column_index, column) in current.columns.iter().enumerate() {
            for row in 0..current.rows.len() {
                let location = cell_location(label, column, row);
                self.compare_cells(
                    current.cell(row, column_index),
                    baseline.cell(row, column_index),
                    &location,
                    &mut report.failures,
                );
            }
        }
        report
    }

    /// Compare two workbooks sheet by sheet.
    ///
    /// A sheet-name set mismatch is one failure; sheets present on both
    /// sides are still compared.
    pub fn compare_workbooks(
        &self,
        current: &[(SheetName, Table)],
        baseline: &[(SheetName, Table)],
    ) -> ComparisonReport {
        let mut report = ComparisonReport::default();
        let current_names: BTreeSet<&str> =
            current.iter().map(|(name, _)| name.as_str()).collect();
        let baseline_names: BTreeSet<&str> =
            baseline.iter().map(|(name, _)| name.as_str()).collect();
        if current_names != baseline_names {
            report.failures.push(format!(
                "sheet-name mismatch (current {current_names:?} vs baseline {baseline_names:?})"
            ));
        }
        for (name, current_table) in current {
            let Some((_, baseline_table)) = baseline
                .iter()
                .find(|(baseline_name, _)| baseline_name == name)
            else {
                continue;
            };
            report.merge(self.compare_tables(current_table, baseline_table, name));
        }
        report
    }

    /// Compare one current file against the loaded baseline.
    ///
    /// Parse failures become comparison failures instead of aborting, so a
    /// corrupt current file still surfaces in the report.
    pub fn compare_file(&self, current_path: &Path, baseline: &BaselineData) -> ComparisonReport {
        let file_label = current_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| current_path.display().to_string());
        let tables = match load_tables(current_path) {
            Ok(tables) => tables,
            Err(err) => {
                return ComparisonReport {
                    failures: vec![format!("{file_label}: {err}")],
                };
            }
        };
        match baseline {
            BaselineData::Table(baseline_table) => {
                let mut report = ComparisonReport::default();
                for (sheet, table) in &tables {
                    let label = match sheet {
                        Some(sheet) => format!("{file_label}:{sheet}"),
                        None => file_label.clone(),
                    };
                    report.merge(self.compare_tables(table, baseline_table, &label));
                }
                report
            }
            BaselineData::Workbook(baseline_sheets) => {
                let current_sheets: Vec<(SheetName, Table)> = tables
                    .into_iter()
                    .map(|(sheet, table)| (sheet.unwrap_or_else(|| file_label.clone()), table))
                    .collect();
                self.compare_workbooks(&current_sheets, baseline_sheets)
            }
        }
    }

    /// Check every metric file in `current_dir` against the baseline file.
    ///
    /// Missing inputs are fatal; individual violations accumulate into the
    /// report so every failure is surfaced in one run.
    pub fn check_directory(
        &self,
        current_dir: &Path,
        baseline_path: &Path,
    ) -> Result<ComparisonReport, CollectError> {
        if !current_dir.is_dir() {
            return Err(CollectError::MissingInput(format!(
                "current metrics directory '{}' does not exist",
                current_dir.display()
            )));
        }
        let baseline = load_baseline(baseline_path)?;

        let mut metric_files: Vec<_> = std::fs::read_dir(current_dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| {
                        matches!(ext.to_ascii_lowercase().as_str(), "csv" | "xlsx" | "xls")
                    })
                    .unwrap_or(false)
            })
            .collect();
        metric_files.sort();
        if metric_files.is_empty() {
            return Err(CollectError::MissingInput(format!(
                "no metric files found under '{}'",
                current_dir.display()
            )));
        }
        info!(
            count = metric_files.len(),
            dir = %current_dir.display(),
            "checking metric files against baseline"
        );

        let mut report = ComparisonReport::default();
        for file in &metric_files {
            let file_report = self.compare_file(file, &baseline);
            if !file_report.passed() {
                warn!(file = %file.display(), failures = file_report.failures.len(), "regression check failed");
            }
            report.merge(file_report);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_value_table(column: &str, cell: Cell) -> Table {
        let mut table = Table::new(vec![column.to_string()]);
        table.rows.push(vec![cell]);
        table
    }

    fn compare_values(current: Cell, baseline: Cell) -> Vec<String> {
        let comparator = BaselineComparator::default();
        let mut failures = Vec::new();
        comparator.compare_cells(&current, &baseline, "MSE[0]", &mut failures);
        failures
    }

    #[test]
    fn relative_tolerance_boundary_is_exact() {
        // 1e-10 below the boundary passes, at/above fails.
        assert!(compare_values(Cell::Number(100.00000009), Cell::Number(100.0)).is_empty());
        assert!(!compare_values(Cell::Number(100.0000001), Cell::Number(100.0)).is_empty());
        assert!(!compare_values(Cell::Number(100.0000002), Cell::Number(100.0)).is_empty());
    }

    #[test]
    fn near_zero_baseline_uses_absolute_difference() {
        assert!(compare_values(Cell::Number(5e-11), Cell::Number(0.0)).is_empty());
        let failures = compare_values(Cell::Number(5e-9), Cell::Number(0.0));
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("near-zero mismatch"));
    }

    #[test]
    fn missing_value_rules() {
        assert!(compare_values(Cell::Empty, Cell::Empty).is_empty());
        let one_sided = compare_values(Cell::Empty, Cell::Number(1.0));
        assert_eq!(one_sided.len(), 1);
        assert!(one_sided[0].contains("missing-value mismatch"));
    }

    #[test]
    fn strings_compare_exactly_without_normalization() {
        assert!(compare_values(
            Cell::Text("converged".to_string()),
            Cell::Text("converged".to_string())
        )
        .is_empty());
        assert!(!compare_values(
            Cell::Text("Converged".to_string()),
            Cell::Text("converged".to_string())
        )
        .is_empty());
        assert!(!compare_values(
            Cell::Text("failed".to_string()),
            Cell::Text("converged".to_string())
        )
        .is_empty());
    }

    #[test]
    fn shape_mismatch_is_one_failure_and_skips_cells() {
        let comparator = BaselineComparator::default();
        let current = single_value_table("MSE", Cell::Number(1.0));
        let mut baseline = Table::new(vec!["MSE".to_string()]);
        baseline.rows.push(vec![Cell::Number(9.0)]);
        baseline.rows.push(vec![Cell::Number(9.0)]);

        let report = comparator.compare_tables(&current, &baseline, "metrics");
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("shape mismatch"));
    }

    #[test]
    fn column_mismatch_is_one_failure() {
        let comparator = BaselineComparator::default();
        let current = single_value_table("MSE", Cell::Number(1.0));
        let baseline = single_value_table("MAE", Cell::Number(1.0));
        let report = comparator.compare_tables(&current, &baseline, "metrics");
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("column mismatch"));
    }

    #[test]
    fn workbook_comparison_continues_past_sheet_set_mismatch() {
        let comparator = BaselineComparator::default();
        let current = vec![
            ("shared".to_string(), single_value_table("MSE", Cell::Number(2.0))),
            ("extra".to_string(), single_value_table("MSE", Cell::Number(1.0))),
        ];
        let baseline = vec![(
            "shared".to_string(),
            single_value_table("MSE", Cell::Number(1.0)),
        )];

        let report = comparator.compare_workbooks(&current, &baseline);
        // One failure for the sheet set, one for the aligned sheet's value.
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].contains("sheet-name mismatch"));
        assert!(report.failures[1].contains("shared.MSE[0]"));
    }

    #[test]
    fn all_violations_are_accumulated_not_just_the_first() {
        let comparator = BaselineComparator::default();
        let mut current = Table::new(vec!["MSE".to_string(), "MAE".to_string()]);
        current.rows.push(vec![Cell::Number(2.0), Cell::Number(3.0)]);
        let mut baseline = Table::new(vec!["MSE".to_string(), "MAE".to_string()]);
        baseline.rows.push(vec![Cell::Number(1.0), Cell::Number(1.0)]);

        let report = comparator.compare_tables(&current, &baseline, "");
        assert_eq!(report.failures.len(), 2);
    }
}
