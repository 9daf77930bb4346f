#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Grouped summary statistics over normalized records.
pub mod aggregate;
/// Baseline comparison and regression verification.
pub mod baseline;
/// End-to-end collection pipeline.
pub mod collect;
/// Collector configuration and run identity.
pub mod config;
/// Centralized constants used across discovery, inference, and persistence.
pub mod constants;
/// Result-file discovery.
pub mod discover;
mod hash;
/// Artifact snapshot manifest and advisory hash check.
pub mod manifest;
/// Path-driven metadata inference.
pub mod metadata;
/// Table-to-record normalization.
pub mod normalize;
/// The canonical long-format result record.
pub mod record;
/// Tabular loaders for CSV, XLSX, and JSON inputs.
pub mod table;
/// Shared type aliases.
pub mod types;
/// Consolidated-workbook persistence.
pub mod workbook;

mod errors;

pub use aggregate::{aggregate, AssetModelSummaryRow, GroupStats, ModelSummaryRow, Summaries, WinrateRow};
pub use baseline::{BaselineComparator, BaselineData, ComparisonReport};
pub use collect::{CollectionReport, CollectionStatus, ResultsCollector, SkippedFile};
pub use config::{CollectorConfig, RunContext};
pub use errors::CollectError;
pub use manifest::{check_artifacts, ArtifactEntry, ArtifactManifest, ManifestDifference};
pub use metadata::{AssetType, FileMetadata, Fold, ModelFamily, SplitType};
pub use normalize::{ColumnPolicy, MetricPolarity, MissingValuePolicy, NormalizerOptions};
pub use record::ResultRecord;
pub use table::{Cell, Table};
pub use types::{AssetName, Location, MetricName, ModelName, PathString, Reason, RunId, SheetName};
pub use workbook::RunSummary;
