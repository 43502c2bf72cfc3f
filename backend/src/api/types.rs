//! REST API types for frontend integration.
//!
//! Tables are sent as a column list plus row arrays of JSON values, with
//! `null` for missing cells.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{ColumnType, Table};
use crate::transform::{BatchReport, ChartData, FileOutcome, OperationFailure, TransformLog};

/// Response sent after `POST /api/process`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    /// Unique job identifier
    pub job_id: String,
    pub processed_at: String,
    /// One entry per uploaded file, in upload order
    pub files: Vec<FileReport>,
}

/// Result for one uploaded file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file_name: String,

    /// Status: "ready", "warning", "error"
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TableSummary>,
}

/// Everything the UI needs to show for a processed table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub loaded_rows: usize,
    pub row_count: usize,
    pub columns: Vec<ColumnInfo>,
    pub preview: Vec<Vec<Value>>,
    pub log: TransformLog,
    pub failures: Vec<OperationFailure>,
    pub chart: ChartData,
}

/// Column metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnType,
    pub missing: usize,
}

/// Column descriptions for a table.
pub fn column_infos(table: &Table) -> Vec<ColumnInfo> {
    table
        .columns()
        .iter()
        .map(|c| ColumnInfo {
            name: c.name().to_string(),
            kind: c.kind(),
            missing: c.missing_count(),
        })
        .collect()
}

/// Rows as JSON arrays, in column order.
pub fn rows_json(table: &Table) -> Vec<Vec<Value>> {
    table
        .rows()
        .map(|row| row.iter().map(|c| c.to_json()).collect())
        .collect()
}

impl From<&FileOutcome> for FileReport {
    fn from(outcome: &FileOutcome) -> Self {
        let table = &outcome.run.table;
        let has_warnings = outcome.run.log.warnings().next().is_some();
        let status = if !outcome.run.failures.is_empty() || has_warnings {
            "warning"
        } else {
            "ready"
        };

        FileReport {
            file_name: outcome.file_name.clone(),
            status: status.to_string(),
            error: None,
            summary: Some(TableSummary {
                loaded_rows: outcome.loaded_rows,
                row_count: table.row_count(),
                columns: column_infos(table),
                preview: rows_json(&outcome.preview),
                log: outcome.run.log.clone(),
                failures: outcome.run.failures.clone(),
                chart: outcome.chart.clone(),
            }),
        }
    }
}

impl FileReport {
    /// Report for a file that could not be processed.
    pub fn failed(file_name: impl Into<String>, error: impl Into<String>) -> Self {
        FileReport {
            file_name: file_name.into(),
            status: "error".to_string(),
            error: Some(error.into()),
            summary: None,
        }
    }
}

impl From<&BatchReport> for ProcessResponse {
    fn from(report: &BatchReport) -> Self {
        let files = report
            .files
            .iter()
            .map(|result| match result {
                Ok(outcome) => FileReport::from(outcome),
                Err(e) => FileReport::failed(e.file(), e.to_string()),
            })
            .collect();

        ProcessResponse {
            job_id: Uuid::new_v4().to_string(),
            processed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            files,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "files": [],
    })
}
