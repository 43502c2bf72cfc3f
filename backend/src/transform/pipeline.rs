//! High-level pipeline API: load -> transform -> export.
//!
//! This module combines the loader, the transform operations and the
//! exporter into per-file runs, and isolates failures across a batch.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabclean::transform::{process_file, Operation, PipelineOptions};
//! use tabclean::export::ExportFormat;
//!
//! let options = PipelineOptions {
//!     operations: vec![Operation::Deduplicate, Operation::FillMissing],
//!     export: Some(ExportFormat::Csv),
//!     ..PipelineOptions::default()
//! };
//! let outcome = process_file("sales.csv", &bytes, &options)?;
//! println!("{} rows after cleaning", outcome.run.table.row_count());
//! ```

use serde::{Deserialize, Serialize};

use super::log::TransformLog;
use super::operations::{chart_series, ChartData, Operation};
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::{PipelineError, PipelineResult, TransformError};
use crate::export::{export_artifact, ExportArtifact, ExportFormat};
use crate::models::Table;
use crate::parser::load_named;

/// Default number of rows in a preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Options for a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Operations to apply, in order
    #[serde(default)]
    pub operations: Vec<Operation>,

    /// Number of rows to include in the preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Export the result in this format
    #[serde(default)]
    pub export: Option<ExportFormat>,
}

fn default_preview_rows() -> usize {
    DEFAULT_PREVIEW_ROWS
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            export: None,
        }
    }
}

/// An operation that could not run. The table was left unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationFailure {
    /// Position of the operation in the requested list
    pub index: usize,
    pub operation: Operation,
    #[serde(skip)]
    pub error: TransformError,
    pub message: String,
}

/// Result of running an operation list over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub table: Table,
    pub log: TransformLog,
    pub failures: Vec<OperationFailure>,
}

impl PipelineRun {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply `operations` in order; each sees the previous output.
///
/// A failing operation is recorded and skipped; the run continues.
pub fn run(table: &Table, operations: &[Operation]) -> PipelineRun {
    let mut current = table.clone();
    let mut log = TransformLog::new();
    let mut failures = Vec::new();

    for (index, operation) in operations.iter().enumerate() {
        match operation.apply(&current) {
            Ok(applied) => {
                log_success(applied.record.describe());
                for warning in &applied.record.warnings {
                    log_warning(warning.as_str());
                }
                current = applied.table;
                log.push(applied.record);
            }
            Err(error) => {
                log_error(format!("{} skipped: {}", operation, error));
                failures.push(OperationFailure {
                    index,
                    operation: operation.clone(),
                    message: error.to_string(),
                    error,
                });
            }
        }
    }

    PipelineRun {
        table: current,
        log,
        failures,
    }
}

/// Everything produced for one uploaded file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub file_name: String,
    /// Row count as loaded, before any operation
    pub loaded_rows: usize,
    pub preview: Table,
    pub chart: ChartData,
    pub run: PipelineRun,
    pub export: Option<ExportArtifact>,
}

/// Load, transform and optionally export one file.
pub fn process_file(
    file_name: &str,
    bytes: &[u8],
    options: &PipelineOptions,
) -> PipelineResult<FileOutcome> {
    log_info(format!("Reading {} ({} bytes)...", file_name, bytes.len()));
    let table = load_named(file_name, bytes).map_err(|source| PipelineError::Load {
        file: file_name.to_string(),
        source,
    })?;
    log_success(format!(
        "Loaded {} rows x {} columns",
        table.row_count(),
        table.column_count()
    ));
    for column in table.columns() {
        log_info(format!("{} ({})", column.name(), column.kind()));
    }

    let loaded_rows = table.row_count();
    let run = run(&table, &options.operations);

    let export = match options.export {
        Some(format) => {
            let artifact = export_artifact(&run.table, format, file_name).map_err(|source| {
                PipelineError::Export {
                    file: file_name.to_string(),
                    source,
                }
            })?;
            log_success(format!(
                "Exported {} ({} bytes)",
                artifact.file_name,
                artifact.bytes.len()
            ));
            Some(artifact)
        }
        None => None,
    };

    Ok(FileOutcome {
        file_name: file_name.to_string(),
        loaded_rows,
        preview: run.table.head(options.preview_rows),
        chart: chart_series(&run.table),
        run,
        export,
    })
}

/// An uploaded file: name (for the extension) and contents.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Per-file results of a batch, in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub files: Vec<PipelineResult<FileOutcome>>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &FileOutcome> + '_ {
        self.files.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PipelineError> + '_ {
        self.files.iter().filter_map(|r| r.as_ref().err())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }
}

/// Process files one after another; a failing file does not stop the rest.
pub fn process_batch(files: &[InputFile], options: &PipelineOptions) -> BatchReport {
    let files = files
        .iter()
        .map(|file| {
            let result = process_file(&file.name, &file.bytes, options);
            if let Err(ref e) = result {
                log_error(e.to_string());
            }
            result
        })
        .collect();

    BatchReport { files }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::models::{Cell, Column};

    fn numbers(t: &Table, name: &str) -> Vec<Option<f64>> {
        t.column(name).unwrap().cells().iter().map(Cell::as_number).collect()
    }

    #[test]
    fn test_default_options() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.preview_rows, 5);
        assert!(opts.operations.is_empty());
        assert!(opts.export.is_none());
    }

    #[test]
    fn test_scenario_dedup_fill_normalize() {
        let options = PipelineOptions {
            operations: vec![
                Operation::Deduplicate,
                Operation::FillMissing,
                Operation::normalize(["a"]),
            ],
            ..PipelineOptions::default()
        };
        let outcome = process_file("s.csv", b"a,b\n1,2\n1,2\n3,\n", &options).unwrap();
        let table = &outcome.run.table;

        assert_eq!(outcome.loaded_rows, 3);
        assert_eq!(table.row_count(), 2);
        assert_eq!(numbers(table, "b"), vec![Some(2.0), Some(2.0)]);
        assert_eq!(numbers(table, "a"), vec![Some(0.0), Some(1.0)]);
        assert_eq!(outcome.run.log.len(), 3);
        assert!(outcome.run.is_clean());
    }

    #[test]
    fn test_order_is_respected() {
        // fill before dedup: the filled row becomes a duplicate
        let table = Table::new(vec![Column::numeric(
            "a",
            vec![Some(1.0), Some(3.0), None, Some(2.0)],
        )])
        .unwrap();
        let fill_first = run(&table, &[Operation::FillMissing, Operation::Deduplicate]);
        let dedup_first = run(&table, &[Operation::Deduplicate, Operation::FillMissing]);

        assert_eq!(numbers(&fill_first.table, "a"), vec![Some(1.0), Some(3.0), Some(2.0)]);
        assert_eq!(
            numbers(&dedup_first.table, "a"),
            vec![Some(1.0), Some(3.0), Some(2.0), Some(2.0)]
        );

        let twice = run(&table, &[Operation::Deduplicate, Operation::Deduplicate]);
        assert_eq!(twice.log.len(), 2);
    }

    #[test]
    fn test_missing_column_aborts_only_that_operation() {
        let table = Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(1.0), Some(5.0)]),
        ])
        .unwrap();
        let result = run(
            &table,
            &[
                Operation::normalize(["nope"]),
                Operation::Deduplicate,
            ],
        );

        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 0);
        assert_eq!(
            result.failures[0].error,
            TransformError::ColumnNotFound("nope".into())
        );
        assert!(result.failures[0].message.contains("nope"));
        assert_eq!(result.log.len(), 1);
        assert_eq!(result.table.row_count(), 2);
    }

    #[test]
    fn test_export_attached() {
        let options = PipelineOptions {
            export: Some(ExportFormat::Csv),
            ..PipelineOptions::default()
        };
        let outcome = process_file("in.csv", b"x\n1\n", &options).unwrap();
        let artifact = outcome.export.unwrap();

        assert_eq!(artifact.file_name, "in.csv.csv");
        assert_eq!(artifact.bytes, b"x\n1\n");
    }

    #[test]
    fn test_preview_rows() {
        let options = PipelineOptions {
            preview_rows: 2,
            ..PipelineOptions::default()
        };
        let outcome = process_file("p.csv", b"n\n1\n2\n3\n4\n", &options).unwrap();
        assert_eq!(outcome.preview.row_count(), 2);
        assert_eq!(outcome.run.table.row_count(), 4);
        assert_eq!(outcome.chart.series[0].values.len(), 4);
    }

    #[test]
    fn test_batch_isolates_bad_files() {
        let files = vec![
            InputFile::new("notes.txt", b"a,b\n1,2\n".to_vec()),
            InputFile::new("empty.csv", Vec::new()),
            InputFile::new("good.csv", b"a,b\n1,2\n".to_vec()),
        ];
        let report = process_batch(&files, &PipelineOptions::default());

        assert_eq!(report.files.len(), 3);
        assert!(report.has_failures());

        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].file(), "notes.txt");
        assert!(matches!(
            failed[0],
            PipelineError::Load { source: LoadError::UnsupportedFormat(_), .. }
        ));
        assert!(matches!(
            failed[1],
            PipelineError::Load { source: LoadError::MalformedInput(_), .. }
        ));

        let ok: Vec<_> = report.succeeded().collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].file_name, "good.csv");
        assert_eq!(ok[0].run.table.row_count(), 1);
    }
}
