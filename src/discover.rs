//! Result-file discovery over the fixed output roots.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::CollectorConfig;

/// Walk the configured roots under `base` and return candidate result files.
///
/// A file qualifies when its extension is in the accepted set, no skip
/// marker appears in its path, and it is at least `min_file_bytes` long.
/// Output is sorted for deterministic processing order.
pub fn discover(base: &Path, config: &CollectorConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in &config.roots {
        let root_path = base.join(root);
        if !root_path.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&root_path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
        {
            let path = entry.path();
            if !has_result_extension(path, &config.extensions) {
                continue;
            }
            if is_excluded(path, &config.skip_markers) {
                debug!(path = %path.display(), "excluded by skip marker");
                continue;
            }
            if entry
                .metadata()
                .map(|meta| meta.len() < config.min_file_bytes)
                .unwrap_or(true)
            {
                debug!(path = %path.display(), "skipped as effectively empty");
                continue;
            }
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files
}

fn has_result_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn is_excluded(path: &Path, skip_markers: &[String]) -> bool {
    // Compare against a normalized separator so markers like "archive/"
    // match on every platform.
    let normalized = path.to_string_lossy().replace('\\', "/");
    skip_markers.iter().any(|marker| normalized.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn payload() -> String {
        // Comfortably above the 100-byte empty-file threshold.
        format!("Model,MSE\n{}\n", "sGARCH,0.01\n".repeat(20))
    }

    #[test]
    fn discovery_applies_roots_extensions_and_exclusions() {
        let temp = tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("outputs/model_eval")).unwrap();
        fs::create_dir_all(base.join("outputs/archive")).unwrap();
        fs::create_dir_all(base.join("results")).unwrap();
        fs::create_dir_all(base.join("unrelated")).unwrap();

        fs::write(base.join("outputs/model_eval/ranking.csv"), payload()).unwrap();
        fs::write(base.join("outputs/model_eval/notes.txt"), payload()).unwrap();
        fs::write(base.join("outputs/archive/stale.csv"), payload()).unwrap();
        fs::write(base.join("outputs/old_run.csv"), payload()).unwrap();
        fs::write(base.join("results/summary.json"), payload()).unwrap();
        fs::write(base.join("unrelated/other.csv"), payload()).unwrap();

        let found = discover(base, &CollectorConfig::default());
        let names: Vec<String> = found
            .iter()
            .map(|path| {
                path.strip_prefix(base)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(
            names,
            vec!["outputs/model_eval/ranking.csv", "results/summary.json"]
        );
    }

    #[test]
    fn tiny_files_are_treated_as_empty() {
        let temp = tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("outputs")).unwrap();
        fs::write(base.join("outputs/stub.csv"), "Model,MSE\n").unwrap();

        let found = discover(base, &CollectorConfig::default());
        assert!(found.is_empty());
    }

    #[test]
    fn missing_roots_are_not_an_error() {
        let temp = tempdir().unwrap();
        assert!(discover(temp.path(), &CollectorConfig::default()).is_empty());
    }
}
