//! Table exporter: CSV and XLSX serialization for download.

use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ExportError, ExportResult};
use crate::models::{Cell, Table};

/// Name of the only worksheet in exported workbooks.
pub const SHEET_NAME: &str = "Sheet1";

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    /// `<original>.<ext>`, keeping the original name whole (`data.xlsx.csv`).
    pub fn suggested_file_name(&self, original: &str) -> String {
        let base = Path::new(original)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("export");
        format!("{}.{}", base, self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" | "spreadsheet" => Ok(ExportFormat::Xlsx),
            _ => Err(ExportError::UnsupportedExportFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Exported bytes with their download metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Serialize a table in the given format.
pub fn export(table: &Table, format: ExportFormat) -> ExportResult<Vec<u8>> {
    match format {
        ExportFormat::Csv => export_csv(table),
        ExportFormat::Xlsx => export_xlsx(table),
    }
}

/// Serialize and attach the MIME type and suggested file name.
pub fn export_artifact(
    table: &Table,
    format: ExportFormat,
    original_name: &str,
) -> ExportResult<ExportArtifact> {
    Ok(ExportArtifact {
        format,
        file_name: format.suggested_file_name(original_name),
        mime_type: format.mime_type(),
        bytes: export(table, format)?,
    })
}

/// Header row, then one line per row. Missing cells are empty fields.
pub fn export_csv(table: &Table) -> ExportResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// Single `Sheet1` worksheet: bold header row, typed data rows.
pub fn export_xlsx(table: &Table) -> ExportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col_idx, column) in table.columns().iter().enumerate() {
        let col = u16::try_from(col_idx).map_err(|_| {
            ExportError::Spreadsheet(rust_xlsxwriter::XlsxError::RowColumnLimitError)
        })?;

        worksheet.write_string_with_format(0, col, column.name(), &header_format)?;

        for (row_idx, cell) in column.cells().iter().enumerate() {
            let row = u32::try_from(row_idx + 1).map_err(|_| {
                ExportError::Spreadsheet(rust_xlsxwriter::XlsxError::RowColumnLimitError)
            })?;
            match cell {
                Cell::Number(n) => {
                    worksheet.write_number(row, col, *n)?;
                }
                Cell::Text(s) => {
                    worksheet.write_string(row, col, s)?;
                }
                Cell::Missing => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
