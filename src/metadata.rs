//! Path-driven metadata inference.
//!
//! Every field is inferred by an explicit ordered list of named rules,
//! first match wins. Inference is total: any string input, including the
//! empty string, resolves to defaults rather than an error.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::constants::discover::RESIDUALS_ROOT;
use crate::constants::vocab::{CONFIG_FILE_CANDIDATES, KNOWN_ASSETS, KNOWN_MODELS};
use crate::hash::{canonical_json, short_digest};
use crate::types::{AssetName, ModelName};

/// GARCH vs NF-GARCH classification axis, orthogonal to the model variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// Classical GARCH estimates.
    Garch,
    /// Normalizing-flow GARCH output (including synthetic residuals).
    NfGarch,
}

impl ModelFamily {
    /// Classify a model name; `NF`/`Flow` anywhere marks the NF family.
    pub fn from_model_name(model: &str) -> Self {
        let lower = model.to_lowercase();
        if lower.contains("nf") || lower.contains("flow") {
            Self::NfGarch
        } else {
            Self::Garch
        }
    }

    /// Persisted label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Garch => "GARCH",
            Self::NfGarch => "NF-GARCH",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset class derived from the asset name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetType {
    /// Currency pair (exactly six alphabetic characters).
    Fx,
    /// Everything else with a known asset name.
    Equity,
    /// No asset name available.
    Unknown,
}

impl AssetType {
    /// Classify an optional asset name.
    pub fn from_asset(asset: Option<&str>) -> Self {
        match asset {
            Some(name) if name.len() == 6 && name.chars().all(|ch| ch.is_alphabetic()) => Self::Fx,
            Some(_) => Self::Equity,
            None => Self::Unknown,
        }
    }

    /// Persisted label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fx => "FX",
            Self::Equity => "Equity",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluation split methodology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitType {
    /// Single chronological train/test split. The default when no split
    /// marker exists in the path; callers rely on this fallback.
    #[default]
    Chrono,
    /// Time-series cross-validation with multiple folds.
    Tscv,
}

impl SplitType {
    /// Persisted label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrono => "chrono",
            Self::Tscv => "tscv",
        }
    }
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-validation fold index, or `All` for non-CV results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Fold {
    /// Non-cross-validated result.
    #[default]
    All,
    /// A specific fold index.
    Index(u32),
}

impl fmt::Display for Fold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(crate::constants::sentinels::FOLD_ALL),
            Self::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// Metadata inferred for one result file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    /// Asset name, canonical vocabulary casing when matched.
    pub asset: Option<AssetName>,
    /// Model name, canonical vocabulary casing when matched.
    pub model: Option<ModelName>,
    /// Split methodology, defaulting to chronological.
    pub split_type: SplitType,
    /// Fold index, defaulting to `All`.
    pub fold: Fold,
    /// Family derived from the model name, when a model was found.
    pub model_family: Option<ModelFamily>,
    /// Asset class derived from the asset name.
    pub asset_type: AssetType,
    /// Truncated digest of an adjacent config file, when one parses.
    pub config_hash: Option<String>,
    /// True when the file lives under the generated-residuals root.
    ///
    /// Synthetic NF output keeps standard GARCH model tokens in its
    /// filenames, so this flag overrides name-level family inference.
    pub synthetic_origin: bool,
}

/// One named inference step: a pure function from path to candidate value.
pub struct InferenceRule<T> {
    /// Rule name, surfaced in tests and docs.
    pub name: &'static str,
    apply: fn(&str) -> Option<T>,
}

impl<T> InferenceRule<T> {
    /// Evaluate the rule against a path.
    pub fn apply(&self, path: &str) -> Option<T> {
        (self.apply)(path)
    }
}

/// Evaluate rules in priority order and return the first match.
pub fn first_match<T>(rules: &[InferenceRule<T>], path: &str) -> Option<T> {
    rules.iter().find_map(|rule| rule.apply(path))
}

/// Asset rules: vocabulary first, then uppercase path tokens.
pub const ASSET_RULES: [InferenceRule<AssetName>; 2] = [
    InferenceRule {
        name: "known_asset_vocabulary",
        apply: asset_from_vocabulary,
    },
    InferenceRule {
        name: "uppercase_path_token",
        apply: asset_from_token,
    },
];

/// Model rules: longest vocabulary match first, then filename patterns.
pub const MODEL_RULES: [InferenceRule<ModelName>; 2] = [
    InferenceRule {
        name: "known_model_vocabulary",
        apply: model_from_vocabulary,
    },
    InferenceRule {
        name: "filename_token",
        apply: model_from_token,
    },
];

fn asset_from_vocabulary(path: &str) -> Option<AssetName> {
    let lower = path.to_lowercase();
    KNOWN_ASSETS
        .iter()
        .find(|asset| lower.contains(&asset.to_lowercase()))
        .map(|asset| asset.to_string())
}

static ASSET_TOKEN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/([A-Z]{3,6})_",
        r"([A-Z]{3,6})\.csv",
        r"([A-Z]{3,6})\.png",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static regex"))
    .collect()
});

fn asset_from_token(path: &str) -> Option<AssetName> {
    ASSET_TOKEN_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(path)
            .map(|captures| captures[1].to_string())
    })
}

fn model_from_vocabulary(path: &str) -> Option<ModelName> {
    let lower = path.to_lowercase();
    KNOWN_MODELS
        .iter()
        .filter(|model| lower.contains(&model.to_lowercase()))
        .max_by_key(|model| model.len())
        .map(|model| model.to_string())
}

static MODEL_TOKEN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"([a-zA-Z_]+)_[a-zA-Z_]+\.csv",
        r"([a-zA-Z_]+)_[a-zA-Z_]+\.png",
        r"([a-zA-Z_]+)_results",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static regex"))
    .collect()
});

fn model_from_token(path: &str) -> Option<ModelName> {
    MODEL_TOKEN_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(path)
            .map(|captures| captures[1].to_string())
    })
}

/// Keyword scan for the split methodology, defaulting to chronological.
pub fn split_type_from_path(path: &str) -> SplitType {
    let lower = path.to_lowercase();
    if lower.contains("tscv") || lower.contains("ts_cv") || lower.contains("cross_validation") {
        SplitType::Tscv
    } else if lower.contains("chrono") {
        // Covers both "chrono" and "chronological".
        SplitType::Chrono
    } else if lower.contains("cv") {
        // Bare "cv" with no tscv marker is assumed to be time-series CV.
        SplitType::Tscv
    } else {
        SplitType::Chrono
    }
}

static FOLD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"fold_(\d+)", r"fold(\d+)", r"(\d+)_fold"]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("static regex"))
        .collect()
});

/// Fold index from the path, `All` when no fold marker exists.
pub fn fold_from_path(path: &str) -> Fold {
    FOLD_PATTERNS
        .iter()
        .find_map(|pattern| {
            pattern
                .captures(path)
                .and_then(|captures| captures[1].parse::<u32>().ok())
        })
        .map(Fold::Index)
        .unwrap_or(Fold::All)
}

/// True when the path is under the generated-residuals root.
pub fn is_generated_residuals_path(path: &str) -> bool {
    path.contains(RESIDUALS_ROOT)
}

/// Infer all metadata for one result-file path.
///
/// Pure and never fails; unresolvable fields fall back to `None`/defaults.
/// `config_hash` is left `None` here: callers that hold the on-disk
/// location probe it once with [`config_hash_for`].
pub fn infer(path: &str) -> FileMetadata {
    let asset = first_match(&ASSET_RULES, path);
    let model = first_match(&MODEL_RULES, path);
    let synthetic_origin = is_generated_residuals_path(path);
    let model_family = if synthetic_origin {
        // Path-level override: synthetic residual files carry standard
        // GARCH tokens in their names but are NF output.
        Some(ModelFamily::NfGarch)
    } else {
        model.as_deref().map(ModelFamily::from_model_name)
    };
    let asset_type = AssetType::from_asset(asset.as_deref());
    FileMetadata {
        asset,
        model,
        split_type: split_type_from_path(path),
        fold: fold_from_path(path),
        model_family,
        asset_type,
        config_hash: None,
        synthetic_origin,
    }
}

/// Digest of the first parseable sibling config file, if any.
///
/// Any read or parse failure moves on to the next candidate; the overall
/// lookup never fails.
pub fn config_hash_for(result_path: &Path) -> Option<String> {
    let dir = result_path.parent()?;
    for candidate in CONFIG_FILE_CANDIDATES {
        let candidate_path = dir.join(candidate);
        if !candidate_path.is_file() {
            continue;
        }
        let Ok(raw) = std::fs::read_to_string(&candidate_path) else {
            continue;
        };
        let parsed: Option<Value> = if candidate.ends_with(".json") {
            serde_json::from_str(&raw).ok()
        } else {
            serde_yaml::from_str(&raw).ok()
        };
        if let Some(value) = parsed {
            return Some(short_digest(&canonical_json(&value)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_is_total_and_idempotent() {
        for path in ["", "no/recognizable/tokens.bin", "outputs/x.csv"] {
            let first = infer(path);
            let second = infer(path);
            assert_eq!(first, second, "inference must be pure for {path:?}");
        }
        let empty = infer("");
        assert_eq!(empty.asset, None);
        assert_eq!(empty.model, None);
        assert_eq!(empty.split_type, SplitType::Chrono);
        assert_eq!(empty.fold, Fold::All);
        assert_eq!(empty.asset_type, AssetType::Unknown);
        assert_eq!(empty.config_hash, None);
    }

    #[test]
    fn asset_vocabulary_wins_and_is_case_insensitive() {
        let meta = infer("results/plots/amzn_histogram.png");
        assert_eq!(meta.asset.as_deref(), Some("AMZN"));
        assert_eq!(meta.asset_type, AssetType::Equity);
    }

    #[test]
    fn asset_token_rule_fires_when_vocabulary_misses() {
        let meta = infer("outputs/tables/XYZQ.csv");
        assert_eq!(meta.asset.as_deref(), Some("XYZQ"));
    }

    #[test]
    fn fx_assets_are_six_alphabetic_characters() {
        assert_eq!(infer("outputs/EURUSD_forecast.csv").asset_type, AssetType::Fx);
        assert_eq!(infer("outputs/AMZN_forecast.csv").asset_type, AssetType::Equity);
    }

    #[test]
    fn longest_model_vocabulary_entry_wins() {
        let meta = infer("outputs/NF_sGARCH_norm_AMZN_fit.csv");
        assert_eq!(meta.model.as_deref(), Some("NF_sGARCH_norm"));
        assert_eq!(meta.model_family, Some(ModelFamily::NfGarch));
    }

    #[test]
    fn model_token_rule_extracts_results_prefix() {
        let meta = infer("outputs/forecast_results/summary.txt");
        assert_eq!(meta.model.as_deref(), Some("forecast"));
    }

    #[test]
    fn split_type_defaults_to_chrono() {
        assert_eq!(split_type_from_path("outputs/model_eval/ranking.csv"), SplitType::Chrono);
        assert_eq!(split_type_from_path("outputs/tscv_results.csv"), SplitType::Tscv);
        assert_eq!(split_type_from_path("outputs/ts_cv/ranking.csv"), SplitType::Tscv);
        assert_eq!(split_type_from_path("outputs/cross_validation/r.csv"), SplitType::Tscv);
        assert_eq!(split_type_from_path("outputs/chronological/r.csv"), SplitType::Chrono);
        // Bare "cv" is assumed to mean time-series CV.
        assert_eq!(split_type_from_path("outputs/cv_pass/r.csv"), SplitType::Tscv);
    }

    #[test]
    fn fold_patterns_apply_in_priority_order() {
        assert_eq!(fold_from_path("outputs/fold_1_results.csv"), Fold::Index(1));
        assert_eq!(fold_from_path("outputs/fold7/ranking.csv"), Fold::Index(7));
        assert_eq!(fold_from_path("outputs/3_fold_results.csv"), Fold::Index(3));
        assert_eq!(fold_from_path("outputs/regular_results.csv"), Fold::All);
    }

    #[test]
    fn residuals_root_forces_nf_family() {
        let meta = infer("nf_generated_residuals/sGARCH_norm_equity_AMZN_residuals_synthetic.csv");
        assert_eq!(meta.model.as_deref(), Some("sGARCH_norm"));
        assert!(meta.synthetic_origin);
        assert_eq!(meta.model_family, Some(ModelFamily::NfGarch));
    }

    #[test]
    fn family_from_name_detects_nf_and_flow() {
        assert_eq!(ModelFamily::from_model_name("NF_eGARCH"), ModelFamily::NfGarch);
        assert_eq!(ModelFamily::from_model_name("flow_garch"), ModelFamily::NfGarch);
        assert_eq!(ModelFamily::from_model_name("sGARCH_norm"), ModelFamily::Garch);
    }

    #[test]
    fn config_hash_reads_first_parseable_sibling() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        std::fs::write(dir.join("config.json"), r#"{"seed": 42, "alpha": 0.1}"#).unwrap();
        let result = dir.join("metrics.csv");
        std::fs::write(&result, "Model,MSE\nsGARCH,0.1\n").unwrap();

        let hash = config_hash_for(&result).expect("hash");
        assert_eq!(hash.len(), 8);

        // Key order must not change the hash.
        std::fs::write(dir.join("config.json"), r#"{"alpha": 0.1, "seed": 42}"#).unwrap();
        assert_eq!(config_hash_for(&result).as_deref(), Some(hash.as_str()));
    }

    #[test]
    fn inference_never_touches_the_filesystem() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        std::fs::write(dir.join("config.json"), r#"{"seed": 42}"#).unwrap();
        let result = dir.join("metrics.csv");
        std::fs::write(&result, "Model,MSE\nsGARCH,0.1\n").unwrap();

        // Even with a parseable sibling config on disk, path inference is
        // pure; the digest comes only from the explicit probe.
        let meta = infer(&result.to_string_lossy());
        assert_eq!(meta.config_hash, None);
        assert!(config_hash_for(&result).is_some());
    }

    #[test]
    fn unparseable_config_yields_none() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        std::fs::write(dir.join("config.json"), "{not json").unwrap();
        let result = dir.join("metrics.csv");
        std::fs::write(&result, "x").unwrap();
        assert_eq!(config_hash_for(&result), None);
    }
}
