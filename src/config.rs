use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::constants::{discover, workbook};
use crate::normalize::{ColumnPolicy, MissingValuePolicy};
use crate::types::RunId;

/// Top-level collection configuration.
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// Root directories scanned for result files, relative to the base dir.
    pub roots: Vec<PathBuf>,
    /// Root whose files are forced to the NF-GARCH family.
    pub residuals_root: String,
    /// File extensions accepted as result files.
    pub extensions: Vec<String>,
    /// Path substrings that exclude a file from collection.
    pub skip_markers: Vec<String>,
    /// Files smaller than this byte count are treated as empty and skipped.
    pub min_file_bytes: u64,
    /// Upper bound on parse time per file; slower files are skipped.
    ///
    /// Malformed spreadsheets can hang parsers, so one bad file must not
    /// stall the whole run.
    pub per_file_timeout: Duration,
    /// Column classification policy used by the normalizer.
    pub column_policy: ColumnPolicy,
    /// Handling of missing metric cells.
    pub missing_values: MissingValuePolicy,
    /// Output workbook path, relative to the base dir.
    pub output_path: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            roots: discover::DEFAULT_ROOTS.iter().map(PathBuf::from).collect(),
            residuals_root: discover::RESIDUALS_ROOT.to_string(),
            extensions: discover::RESULT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            skip_markers: discover::SKIP_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
            min_file_bytes: discover::MIN_RESULT_FILE_BYTES,
            per_file_timeout: Duration::from_secs(30),
            column_policy: ColumnPolicy::default(),
            missing_values: MissingValuePolicy::default(),
            output_path: PathBuf::from(workbook::DEFAULT_OUTPUT_FILE),
        }
    }
}

/// Batch identity passed into every component instead of ambient clock reads.
///
/// Tests inject a fixed context so emitted records are reproducible.
#[derive(Clone, Debug)]
pub struct RunContext {
    /// Unique id for this collection run.
    pub run_id: RunId,
    /// Timestamp stamped onto every record of the run.
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    /// Context derived from the current wall clock.
    pub fn now() -> Self {
        let started_at = Utc::now();
        Self {
            run_id: format!("run_{}", started_at.format("%Y%m%d_%H%M%S")),
            started_at,
        }
    }

    /// Fixed context for deterministic tests and replays.
    pub fn fixed(run_id: impl Into<RunId>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_config_mirrors_discovery_constants() {
        let config = CollectorConfig::default();
        assert_eq!(config.roots.len(), 4);
        assert_eq!(config.residuals_root, "nf_generated_residuals");
        assert!(config.extensions.iter().any(|ext| ext == "xlsx"));
        assert_eq!(config.min_file_bytes, 100);
    }

    #[test]
    fn fixed_context_is_reproducible() {
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 12).unwrap();
        let ctx = RunContext::fixed("run_test", at);
        assert_eq!(ctx.run_id, "run_test");
        assert_eq!(ctx.started_at, at);
    }
}
