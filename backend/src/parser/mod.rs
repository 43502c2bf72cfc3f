//! Table loader for CSV and spreadsheet uploads.
//!
//! CSV bytes go through encoding auto-detection before parsing; `.xlsx` and
//! `.xls` workbooks are read from their first sheet only. Both paths share the
//! same header and type-inference rules (see [`Column::infer`]).

use calamine::{Data, ExcelDateTime, Range, Reader, Xls, Xlsx};
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::models::{Column, RawCell, Table};

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Csv,
    Xlsx,
    Xls,
}

impl InputFormat {
    /// Resolve a declared extension such as `.CSV`, `xlsx` or `.xls`.
    pub fn from_extension(extension: &str) -> LoadResult<Self> {
        let normalized = extension.trim().trim_start_matches('.').to_lowercase();
        match normalized.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "xls" => Ok(Self::Xls),
            _ => Err(LoadError::UnsupportedFormat(format!(".{}", normalized))),
        }
    }

    /// Resolve the format from a file name's extension.
    pub fn from_file_name(file_name: &str) -> LoadResult<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        Self::from_extension(extension)
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Csv => f.write_str("csv"),
            InputFormat::Xlsx => f.write_str("xlsx"),
            InputFormat::Xls => f.write_str("xls"),
        }
    }
}

/// Load a table from bytes and a declared extension.
///
/// # Example
/// ```ignore
/// use tabclean::parser::load;
///
/// let table = load(b"a,b\n1,2\n", ".csv").unwrap();
/// assert_eq!(table.row_count(), 1);
/// ```
pub fn load(bytes: &[u8], declared_extension: &str) -> LoadResult<Table> {
    match InputFormat::from_extension(declared_extension)? {
        InputFormat::Csv => load_csv(bytes),
        InputFormat::Xlsx => load_xlsx(bytes),
        InputFormat::Xls => load_xls(bytes),
    }
}

/// Load a table from bytes, taking the extension from `file_name`.
pub fn load_named(file_name: &str, bytes: &[u8]) -> LoadResult<Table> {
    match InputFormat::from_file_name(file_name)? {
        InputFormat::Csv => load_csv(bytes),
        InputFormat::Xlsx => load_xlsx(bytes),
        InputFormat::Xls => load_xls(bytes),
    }
}

/// Read a file from disk and load it.
pub fn load_path<P: AsRef<Path>>(path: P) -> LoadResult<Table> {
    let path = path.as_ref();
    // Reject unknown extensions before touching the disk
    InputFormat::from_file_name(&path.to_string_lossy())?;
    let bytes = std::fs::read(path)?;
    load_named(&path.to_string_lossy(), &bytes)
}

// =============================================================================
// CSV
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the detected encoding label.
///
/// Valid UTF-8 always wins; unknown labels fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => match encoding_rs::Encoding::for_label(encoding.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };
    text.trim_start_matches('\u{feff}').to_string()
}

/// Parse comma-delimited bytes; the first record is the header.
pub fn load_csv(bytes: &[u8]) -> LoadResult<Table> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(LoadError::MalformedInput("file is empty".into()));
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let header_record = reader
        .headers()
        .map_err(|e| LoadError::MalformedInput(format!("cannot read header: {}", e)))?
        .clone();
    if header_record.is_empty() {
        return Err(LoadError::MalformedInput("no header row".into()));
    }
    let headers = normalize_headers(header_record.iter().map(str::to_string).collect());

    let mut raw_columns: Vec<Vec<RawCell>> = vec![Vec::new(); headers.len()];
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LoadError::MalformedInput(e.to_string()))?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 2);

        // A whitespace-only line in a multi-column file; in a single-column
        // file the same record is a row with one missing cell.
        if headers.len() > 1 && record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() > headers.len() {
            return Err(LoadError::MalformedInput(format!(
                "line {}: expected {} fields, saw {}",
                line,
                headers.len(),
                record.len()
            )));
        }

        for (col, cells) in raw_columns.iter_mut().enumerate() {
            let cell = record.get(col).map(RawCell::from_text).unwrap_or(RawCell::Missing);
            cells.push(cell);
        }
    }

    build_table(headers, raw_columns)
}

// =============================================================================
// Spreadsheets
// =============================================================================

/// Read the first sheet of an `.xlsx` workbook.
pub fn load_xlsx(bytes: &[u8]) -> LoadResult<Table> {
    let workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| LoadError::MalformedInput(format!("cannot open workbook: {}", e)))?;
    load_first_sheet(workbook)
}

/// Read the first sheet of a legacy `.xls` workbook.
pub fn load_xls(bytes: &[u8]) -> LoadResult<Table> {
    let workbook: Xls<_> = Xls::new(Cursor::new(bytes))
        .map_err(|e| LoadError::MalformedInput(format!("cannot open workbook: {}", e)))?;
    load_first_sheet(workbook)
}

fn load_first_sheet<RS, R>(mut workbook: R) -> LoadResult<Table>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
    R::Error: fmt::Display,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::MalformedInput("workbook has no sheets".into()))?
        .map_err(|e| LoadError::MalformedInput(format!("cannot read first sheet: {}", e)))?;
    table_from_range(&range)
}

fn table_from_range(range: &Range<Data>) -> LoadResult<Table> {
    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| LoadError::MalformedInput("first sheet is empty".into()))?;
    let headers = normalize_headers(header_row.iter().map(header_text).collect());

    let mut raw_columns: Vec<Vec<RawCell>> = vec![Vec::new(); headers.len()];
    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        for (col, cells) in raw_columns.iter_mut().enumerate() {
            cells.push(row.get(col).map(raw_from_data).unwrap_or(RawCell::Missing));
        }
    }

    build_table(headers, raw_columns)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) => crate::models::Cell::Number(*f).to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn raw_from_data(cell: &Data) -> RawCell {
    match cell {
        Data::Empty | Data::Error(_) => RawCell::Missing,
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::String(s) => RawCell::from_text(s.trim()),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => date_text(dt).map(RawCell::Text).unwrap_or(RawCell::Missing),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
    }
}

/// ISO 8601 rendering of a date cell; the raw serial would infer as a number.
fn date_text(dt: &ExcelDateTime) -> Option<String> {
    if dt.is_duration() {
        return dt.as_duration().map(|d| d.to_string());
    }
    let datetime = dt.as_datetime()?;
    if datetime.num_seconds_from_midnight() == 0 && datetime.nanosecond() == 0 {
        Some(datetime.format("%Y-%m-%d").to_string())
    } else {
        Some(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Give blank headers a positional name and make repeated names unique.
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            name.trim().to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while out.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        out.push(candidate);
    }
    out
}

fn build_table(headers: Vec<String>, raw_columns: Vec<Vec<RawCell>>) -> LoadResult<Table> {
    let columns = headers
        .into_iter()
        .zip(raw_columns)
        .map(|(name, raw)| Column::infer(name, raw))
        .collect();
    Ok(Table::new(columns)?)
}
