//! # tabclean - load, clean and export tabular data
//!
//! tabclean reads CSV and spreadsheet uploads into an in-memory table,
//! applies an ordered list of cleaning operations, and exports the result
//! as CSV or XLSX.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│  Transform  │────▶│   Export    │
//! │   upload    │     │ (auto-enc)  │     │ (ordered)   │     │ (csv/xlsx)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tabclean::{load, run, export, ExportFormat, Operation};
//!
//! let table = load(b"a,b\n1,2\n1,2\n3,\n", ".csv")?;
//! let result = run(&table, &[Operation::Deduplicate, Operation::FillMissing]);
//! let csv = export(&result.table, ExportFormat::Csv)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per pipeline stage
//! - [`models`] - Table, Column, Cell, ColumnSelector
//! - [`parser`] - CSV / XLSX / XLS loading with type inference
//! - [`transform`] - Operations, transform log, pipeline runs and batches
//! - [`export`] - CSV and XLSX serialization
//! - [`config`] - Defaults and environment overrides
//! - [`api`] - HTTP API server and log stream

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Loading
pub mod parser;

// Transformation
pub mod transform;

// Export
pub mod export;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ExportError, LoadError, PipelineError, ServerError, TableError, TransformError,
    UndefinedStatistic,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, Column, ColumnSelector, ColumnType, RawCell, Table};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use parser::{load, load_named, load_path, InputFormat};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    chart_series, deduplicate, fill_missing, normalize, operations_description, process_batch,
    process_file, run, Affected, BatchReport, ChartData, FileOutcome, InputFile, LogRecord,
    Operation, OperationFailure, PipelineOptions, PipelineRun, Series, TransformLog,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{export, export_artifact, ExportArtifact, ExportFormat};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::AppConfig;

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
