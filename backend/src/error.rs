//! Error types for the tabclean pipeline.
//!
//! This module defines one error enum per pipeline stage:
//!
//! - [`LoadError`] - Reading CSV or spreadsheet bytes into a table
//! - [`TableError`] - Building a table with inconsistent shape
//! - [`TransformError`] - A single transform operation that could not run
//! - [`UndefinedStatistic`] - Degenerate mean / min-max cases (logged, never raised)
//! - [`ExportError`] - Serializing a table to CSV or XLSX
//! - [`PipelineError`] - Per-file orchestration errors
//! - [`ServerError`] - HTTP API errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Loading Errors
// =============================================================================

/// Errors while turning uploaded bytes into a [`crate::models::Table`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// Extension is not one of `.csv`, `.xlsx`, `.xls`.
    #[error("Unsupported file type '{0}' (expected .csv, .xlsx or .xls)")]
    UnsupportedFormat(String),

    /// The bytes could not be parsed as a table at all.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TableError> for LoadError {
    fn from(err: TableError) -> Self {
        LoadError::MalformedInput(err.to_string())
    }
}

// =============================================================================
// Table Construction Errors
// =============================================================================

/// Errors when assembling a table from columns.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    /// Columns do not share the same row count.
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Two columns share a name.
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors raised by a transform operation. The table is left unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    /// Column selector references a column that does not exist.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Numeric operation requested on a text column.
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),
}

/// Degenerate statistics handled by soft fallback.
///
/// These are rendered into transform log warnings instead of being returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UndefinedStatistic {
    /// Numeric column without any value: mean is undefined.
    #[error("column '{0}' has no values, mean is undefined; missing cells left unchanged")]
    Mean(String),

    /// Numeric column without any value: min and max are undefined.
    #[error("column '{0}' has no values, min/max is undefined; column left unchanged")]
    EmptyRange(String),

    /// Constant column: max equals min.
    #[error("column '{0}' is constant (min == max); all values mapped to 0")]
    ZeroRange(String),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing a table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Requested output format is neither CSV nor XLSX.
    #[error("Unsupported export format '{0}' (expected csv or xlsx)")]
    UnsupportedExportFormat(String),

    /// CSV writer error.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet writer error.
    #[error("Spreadsheet write error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// IO error while flushing output.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Pipeline Errors (per file)
// =============================================================================

/// Per-file pipeline errors. In a batch these are reported, not propagated.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading failed.
    #[error("{file}: {source}")]
    Load {
        file: String,
        #[source]
        source: LoadError,
    },

    /// Export failed.
    #[error("{file}: {source}")]
    Export {
        file: String,
        #[source]
        source: ExportError,
    },
}

impl PipelineError {
    /// Name of the file the error belongs to.
    pub fn file(&self) -> &str {
        match self {
            PipelineError::Load { file, .. } | PipelineError::Export { file, .. } => file,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ExportError> for ServerError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnsupportedExportFormat(_) => ServerError::BadRequest(err.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // TableError -> LoadError
        let table_err = TableError::DuplicateColumn("price".into());
        let load_err: LoadError = table_err.into();
        assert!(matches!(load_err, LoadError::MalformedInput(_)));
        assert!(load_err.to_string().contains("price"));

        // PipelineError -> ServerError
        let pipeline_err = PipelineError::Load {
            file: "notes.txt".into(),
            source: LoadError::UnsupportedFormat(".txt".into()),
        };
        let server_err: ServerError = pipeline_err.into();
        assert!(server_err.to_string().contains("notes.txt"));
    }

    #[test]
    fn test_pipeline_error_names_file() {
        let err = PipelineError::Load {
            file: "broken.xlsx".into(),
            source: LoadError::MalformedInput("not a zip archive".into()),
        };
        assert_eq!(err.file(), "broken.xlsx");
        let msg = err.to_string();
        assert!(msg.contains("broken.xlsx"));
        assert!(msg.contains("not a zip archive"));
    }

    #[test]
    fn test_unsupported_export_is_bad_request() {
        let err: ServerError = ExportError::UnsupportedExportFormat("pdf".into()).into();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[test]
    fn test_undefined_statistic_format() {
        let msg = UndefinedStatistic::Mean("score".into()).to_string();
        assert!(msg.contains("score"));
        assert!(msg.contains("mean"));
    }
}
