/// Constants used by metadata inference vocabularies.
pub mod vocab {
    /// Known asset tickers/pairs matched case-insensitively against paths.
    pub const KNOWN_ASSETS: [&str; 12] = [
        // Equity
        "AMZN", "CAT", "MSFT", "NVDA", "PG", "WMT",
        // FX
        "EURUSD", "EURZAR", "GBPCNY", "GBPUSD", "GBPZAR", "USDZAR",
    ];

    /// Known model identifiers, including NF-prefixed variants.
    ///
    /// Matching prefers the longest entry so `sGARCH` never wins inside
    /// `sGARCH_norm`.
    pub const KNOWN_MODELS: [&str; 10] = [
        "sGARCH_norm",
        "sGARCH_sstd",
        "eGARCH",
        "gjrGARCH",
        "TGARCH",
        "NF_sGARCH_norm",
        "NF_sGARCH_sstd",
        "NF_eGARCH",
        "NF_gjrGARCH",
        "NF_TGARCH",
    ];

    /// Keyword vocabulary used to classify columns as metric columns.
    pub const METRIC_INDICATORS: [&str; 23] = [
        "mse",
        "mae",
        "mape",
        "rmse",
        "aic",
        "bic",
        "loglik",
        "log_likelihood",
        "win_rate",
        "accuracy",
        "r_squared",
        "correlation",
        "p_value",
        "violation_rate",
        "qstat",
        "archlm",
        "convergence",
        "error",
        "loss",
        "avg_mse",
        "avg_mae",
        "avg_mape",
        "avg_rmse",
    ];

    /// Ordered case-variant aliases tried when locating the asset column.
    pub const ASSET_COLUMN_ALIASES: [&str; 5] = ["asset", "Asset", "ASSET", "symbol", "Symbol"];
    /// Ordered case-variant aliases tried when locating the model column.
    pub const MODEL_COLUMN_ALIASES: [&str; 5] = ["model", "Model", "MODEL", "method", "Method"];

    /// Candidate config filenames probed for the config hash, in order.
    pub const CONFIG_FILE_CANDIDATES: [&str; 9] = [
        "config.json",
        "config.yaml",
        "config.yml",
        "params.json",
        "params.yaml",
        "params.yml",
        "settings.json",
        "settings.yaml",
        "settings.yml",
    ];

    /// Metric keywords where a lower value is better.
    pub const LOWER_IS_BETTER: [&str; 11] = [
        "mse",
        "mae",
        "mape",
        "aic",
        "bic",
        "rmse",
        "error",
        "loss",
        "violation_rate",
        "qstat",
        "archlm_pval",
    ];

    /// Metric keywords where a higher value is better.
    pub const HIGHER_IS_BETTER: [&str; 9] = [
        "loglik",
        "log_likelihood",
        "likelihood",
        "win_rate",
        "accuracy",
        "r_squared",
        "correlation",
        "p_value",
        "convergence",
    ];
}

/// Constants used by result-file discovery.
pub mod discover {
    /// Root directories globbed for result files, relative to the base dir.
    pub const DEFAULT_ROOTS: [&str; 4] =
        ["outputs", "results", "data/processed", "nf_generated_residuals"];

    /// Directory holding synthetic NF-generated residuals.
    ///
    /// Any file under this root is forced to the NF-GARCH family regardless
    /// of the model token embedded in its name.
    pub const RESIDUALS_ROOT: &str = "nf_generated_residuals";

    /// File extensions considered result files.
    pub const RESULT_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "json"];

    /// Path substrings that exclude a file from collection.
    pub const SKIP_MARKERS: [&str; 13] = [
        "archive/",
        "old_",
        "duplicate_",
        "legacy_",
        "unused_",
        "__pycache__/",
        ".git/",
        "node_modules/",
        "checkpoints/",
        "environment/",
        "scripts/",
        "tools/",
        "tests/",
    ];

    /// Files smaller than this are treated as empty and skipped.
    pub const MIN_RESULT_FILE_BYTES: u64 = 100;
}

/// Constants used by baseline comparison.
pub mod baseline {
    /// Default relative tolerance for numeric comparisons.
    pub const DEFAULT_TOLERANCE: f64 = 1e-9;
    /// Baselines with magnitude below this use absolute-difference comparison.
    pub const NEAR_ZERO_THRESHOLD: f64 = 1e-10;
    /// Default frozen baseline file consumed by the regression check.
    pub const DEFAULT_BASELINE_FILE: &str = "expected/metrics_baseline.csv";
    /// Default directory of current metric tables checked against the baseline.
    pub const DEFAULT_CURRENT_DIR: &str = "outputs/standardized";
}

/// Constants used by the artifact snapshot manifest.
pub mod manifest {
    /// Default artifacts directory hashed by the snapshot.
    pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
    /// Default path for the written snapshot manifest.
    pub const DEFAULT_MANIFEST_FILE: &str = "artifacts_manifest.json";
    /// Default frozen manifest consumed by the advisory hash check.
    pub const DEFAULT_EXPECTED_MANIFEST: &str = "expected/artifacts_manifest.json";
    /// Read chunk size for streaming file hashes.
    pub const HASH_READ_CHUNK: usize = 4096;
}

/// Constants used by the persisted output workbook.
pub mod workbook {
    /// Default output workbook path, relative to the base dir.
    pub const DEFAULT_OUTPUT_FILE: &str = "artifacts/results_consolidated.xlsx";
    /// Long-format master sheet.
    pub const SHEET_MASTER: &str = "master";
    /// Per-(model, metric) summary sheet.
    pub const SHEET_SUMMARY_BY_MODEL: &str = "summary_by_model";
    /// Per-(asset, model, metric) summary sheet.
    pub const SHEET_SUMMARY_BY_ASSET_MODEL: &str = "summary_by_asset_model";
    /// NF-GARCH vs GARCH win-rate sheet.
    pub const SHEET_WINRATES: &str = "winrates";
    /// Run metadata sheet.
    pub const SHEET_METADATA: &str = "metadata";

    /// Column order of the master sheet.
    pub const MASTER_COLUMNS: [&str; 14] = [
        "asset",
        "model",
        "model_family",
        "split_type",
        "fold",
        "metric",
        "value",
        "run_id",
        "timestamp",
        "source_file",
        "sheet_name",
        "row_index",
        "asset_type",
        "config_hash",
    ];
}

/// Sentinel strings used only in persisted output, never in memory.
pub mod sentinels {
    /// Asset label for rows that do not apply to a single asset.
    pub const ALL_ASSETS: &str = "All_Assets";
    /// Model label for rows with no model attribution.
    pub const SUMMARY: &str = "Summary";
    /// Label for unresolved asset types.
    pub const UNKNOWN: &str = "Unknown";
    /// Fold label for non-cross-validated results.
    pub const FOLD_ALL: &str = "all";
}
