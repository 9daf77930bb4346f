/// Asset identifier as written in source data.
/// Examples: `AMZN`, `EURUSD`
pub type AssetName = String;
/// Model identifier as written in source data.
/// Examples: `sGARCH_norm`, `NF_eGARCH`
pub type ModelName = String;
/// Normalized metric name.
/// Examples: `MSE`, `LogLikelihood`, `R_Squared`
pub type MetricName = String;
/// Batch identity assigned once per collection run.
/// Example: `run_20250115_093012`
pub type RunId = String;
/// Sheet name propagated from multi-sheet workbooks.
/// Examples: `master`, `summary_by_model`
pub type SheetName = String;
/// File path rendered as a string for provenance and reporting.
/// Example: `outputs/model_eval/tables/model_ranking.csv`
pub type PathString = String;
/// Location label used in comparison failure messages.
/// Examples: `MSE[3]`, `summary_by_model.mean[0]`
pub type Location = String;
/// Human-readable reason attached to skipped files and failures.
/// Examples: `timed out`, `invalid utf-8 in header`
pub type Reason = String;
