//! Artifact snapshot manifest and the advisory hash check.
//!
//! The snapshot records size, SHA-256 digest, and modification time for
//! every file under the artifacts directory. The check against a frozen
//! manifest is advisory: differences are reported but never fail a run,
//! since artifacts legitimately change between runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::errors::CollectError;
use crate::hash::file_digest;

/// Snapshot entry for a single artifact file.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ArtifactEntry {
    /// File size in bytes.
    pub size: u64,
    /// Full SHA-256 hex digest of the file contents.
    pub hash: String,
    /// Last-modified time at snapshot.
    pub modified: DateTime<Utc>,
}

/// Manifest of every artifact file at one point in time.
///
/// Entries are keyed by separator-normalized relative path, so manifests
/// written on different platforms compare cleanly.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ArtifactManifest {
    /// When the snapshot was taken.
    pub generated_at: DateTime<Utc>,
    /// Directory the snapshot covers, as given.
    pub artifacts_dir: String,
    /// Relative path to entry, sorted by path.
    pub files: BTreeMap<String, ArtifactEntry>,
}

/// One detected difference between two manifests.
#[derive(Clone, Debug, PartialEq)]
pub enum ManifestDifference {
    /// Present now, absent from the expected manifest.
    Added(String),
    /// Present in the expected manifest, absent now.
    Removed(String),
    /// Present in both with a different digest or size.
    Changed(String),
}

impl std::fmt::Display for ManifestDifference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added(path) => write!(f, "added: {path}"),
            Self::Removed(path) => write!(f, "removed: {path}"),
            Self::Changed(path) => write!(f, "changed: {path}"),
        }
    }
}

impl ArtifactManifest {
    /// Hash every file under `artifacts_dir` into a fresh manifest.
    pub fn snapshot(artifacts_dir: &Path, generated_at: DateTime<Utc>) -> Result<Self, CollectError> {
        if !artifacts_dir.is_dir() {
            return Err(CollectError::MissingInput(format!(
                "artifacts directory '{}' does not exist",
                artifacts_dir.display()
            )));
        }
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(artifacts_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
        {
            let path = entry.path();
            let relative = path
                .strip_prefix(artifacts_dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let metadata = entry.metadata().map_err(|err| {
                CollectError::Manifest(format!("cannot stat '{}': {err}", path.display()))
            })?;
            let modified: DateTime<Utc> = metadata
                .modified()
                .map(DateTime::from)
                .unwrap_or(generated_at);
            files.insert(
                relative,
                ArtifactEntry {
                    size: metadata.len(),
                    hash: file_digest(path)?,
                    modified,
                },
            );
        }
        info!(
            count = files.len(),
            dir = %artifacts_dir.display(),
            "snapshotted artifact hashes"
        );
        Ok(Self {
            generated_at,
            artifacts_dir: artifacts_dir.to_string_lossy().replace('\\', "/"),
            files,
        })
    }

    /// Read a manifest previously written by [`ArtifactManifest::save`].
    pub fn load(path: &Path) -> Result<Self, CollectError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            CollectError::MissingInput(format!("cannot read manifest '{}': {err}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            CollectError::Manifest(format!("malformed manifest '{}': {err}", path.display()))
        })
    }

    /// Write the manifest as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), CollectError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let rendered = serde_json::to_string_pretty(self)
            .map_err(|err| CollectError::Manifest(err.to_string()))?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Differences of `self` (current) against `expected`.
    ///
    /// Modification times are ignored; only content identity matters.
    pub fn diff(&self, expected: &Self) -> Vec<ManifestDifference> {
        let mut differences = Vec::new();
        for (path, entry) in &self.files {
            match expected.files.get(path) {
                None => differences.push(ManifestDifference::Added(path.clone())),
                Some(expected_entry)
                    if expected_entry.hash != entry.hash || expected_entry.size != entry.size =>
                {
                    differences.push(ManifestDifference::Changed(path.clone()));
                }
                Some(_) => {}
            }
        }
        for path in expected.files.keys() {
            if !self.files.contains_key(path) {
                differences.push(ManifestDifference::Removed(path.clone()));
            }
        }
        differences
    }
}

/// Advisory check of the current artifacts against a frozen manifest.
///
/// Every difference is logged at warn level. The result is informational
/// and callers must not turn it into a process failure.
pub fn check_artifacts(
    artifacts_dir: &Path,
    expected_manifest: &Path,
) -> Result<Vec<ManifestDifference>, CollectError> {
    if !expected_manifest.is_file() {
        // First run: nothing frozen yet, nothing to drift from.
        info!(
            manifest = %expected_manifest.display(),
            "no expected manifest; treating as a clean first run"
        );
        return Ok(Vec::new());
    }
    let expected = ArtifactManifest::load(expected_manifest)?;
    let current = ArtifactManifest::snapshot(artifacts_dir, Utc::now())?;
    let differences = current.diff(&expected);
    if differences.is_empty() {
        info!("artifact hashes match the expected manifest");
    } else {
        for difference in &differences {
            warn!(%difference, "artifact drift");
        }
    }
    Ok(differences)
}
