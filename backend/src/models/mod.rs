//! Domain models for the tabclean pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Table`] - Ordered, named, equal-length columns
//! - [`Column`] - A named, homogeneously typed sequence of cells
//! - [`Cell`] - Number, text, or the missing marker
//! - [`ColumnType`] - Numeric or text, inferred at load time
//! - [`ColumnSelector`] - A set of column names resolved against a table

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::error::{TableError, TransformError};

// =============================================================================
// Cell
// =============================================================================

/// A single table cell.
///
/// `Number` always holds a finite value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Hashable identity used to compare rows. Missing equals missing.
    pub(crate) fn key(&self) -> CellKey {
        match self {
            // -0.0 and 0.0 compare equal, so they must share a key
            Cell::Number(n) if *n == 0.0 => CellKey::Number(0),
            Cell::Number(n) => CellKey::Number(n.to_bits()),
            Cell::Text(s) => CellKey::Text(s.clone()),
            Cell::Missing => CellKey::Missing,
        }
    }

    /// JSON rendering for previews: numbers, strings, `null` for missing.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Missing => Value::Null,
        }
    }
}

/// Renders the cell the way it is written to CSV: missing is empty.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
            Cell::Missing => Ok(()),
        }
    }
}

/// Hashable stand-in for a [`Cell`], used for row equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CellKey {
    Number(u64),
    Text(String),
    Missing,
}

// =============================================================================
// Raw cells and type inference
// =============================================================================

/// Spellings treated as the missing marker when reading text cells.
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A cell as read from the source, before the column type is known.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    /// Textual value (CSV field or spreadsheet string).
    Text(String),
    /// Native number from a spreadsheet.
    Number(f64),
    Missing,
}

impl RawCell {
    /// Classify a text field, mapping NA spellings to missing.
    pub fn from_text(value: &str) -> Self {
        if MISSING_MARKERS.contains(&value) {
            RawCell::Missing
        } else {
            RawCell::Text(value.to_string())
        }
    }

    fn numeric_value(&self) -> Option<f64> {
        match self {
            RawCell::Number(n) => Some(*n).filter(|n| n.is_finite()),
            RawCell::Text(s) => parse_number(s),
            RawCell::Missing => None,
        }
    }
}

/// Parse a finite number. `inf` and friends stay text.
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

// =============================================================================
// Column
// =============================================================================

/// Type of a column, inferred from its non-missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Text,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Numeric => f.write_str("numeric"),
            ColumnType::Text => f.write_str("text"),
        }
    }
}

/// A named column of homogeneously typed cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnType,
    cells: Vec<Cell>,
}

impl Column {
    /// Build a numeric column. `None` becomes missing; non-finite values too.
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let cells = values
            .into_iter()
            .map(|v| match v {
                Some(n) if n.is_finite() => Cell::Number(n),
                _ => Cell::Missing,
            })
            .collect();
        Self {
            name: name.into(),
            kind: ColumnType::Numeric,
            cells,
        }
    }

    /// Build a text column. `None` becomes missing.
    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        let cells = values
            .into_iter()
            .map(|v| v.map(|s| Cell::Text(s.into())).unwrap_or(Cell::Missing))
            .collect();
        Self {
            name: name.into(),
            kind: ColumnType::Text,
            cells,
        }
    }

    /// Infer the column type from raw cells.
    ///
    /// Numeric if every non-missing cell is a finite number (an all-missing
    /// column is numeric); otherwise text, keeping the source spelling.
    pub fn infer(name: impl Into<String>, raw: Vec<RawCell>) -> Self {
        let numeric = raw
            .iter()
            .all(|c| matches!(c, RawCell::Missing) || c.numeric_value().is_some());

        if numeric {
            let cells = raw
                .iter()
                .map(|c| c.numeric_value().map(Cell::Number).unwrap_or(Cell::Missing))
                .collect();
            return Self {
                name: name.into(),
                kind: ColumnType::Numeric,
                cells,
            };
        }

        let cells = raw
            .into_iter()
            .map(|c| match c {
                RawCell::Text(s) => Cell::Text(s),
                RawCell::Number(n) => Cell::Text(Cell::Number(n).to_string()),
                RawCell::Missing => Cell::Missing,
            })
            .collect();
        Self {
            name: name.into(),
            kind: ColumnType::Text,
            cells,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnType {
        self.kind
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnType::Numeric
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Non-missing numeric values in row order.
    pub fn values(&self) -> impl Iterator<Item = f64> + Clone + '_ {
        self.cells.iter().filter_map(Cell::as_number)
    }

    /// Count of missing cells.
    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }

    /// Same name and type, new cells. Callers keep the cell types homogeneous.
    pub(crate) fn with_cells(&self, cells: Vec<Cell>) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            cells,
        }
    }
}

// =============================================================================
// Table
// =============================================================================

/// An in-memory table of named columns with a shared row count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, checking that names are unique and lengths match.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }

        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(TableError::RaggedColumn {
                    column: bad.name.clone(),
                    expected,
                    actual: bad.len(),
                });
            }
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Cells of row `index`, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Cell>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.cells[index]).collect())
    }

    /// Iterate rows as vectors of cell references.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.row_count()).map(move |i| self.columns.iter().map(|c| &c.cells[i]).collect())
    }

    /// Numeric columns in encounter order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter().filter(|c| c.is_numeric())
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let take = n.min(self.row_count());
        self.select_rows(&(0..take).collect::<Vec<_>>())
    }

    /// New table with only the given rows, in the given order.
    pub(crate) fn select_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| c.with_cells(indices.iter().map(|&i| c.cells[i].clone()).collect()))
            .collect();
        Table { columns }
    }

    /// New table with the column at `index` swapped for `column`.
    ///
    /// The replacement keeps the row count.
    pub(crate) fn replace_column(&self, index: usize, column: Column) -> Table {
        debug_assert_eq!(column.len(), self.row_count());
        let mut columns = self.columns.clone();
        columns[index] = column;
        Table { columns }
    }
}

// =============================================================================
// Column Selector
// =============================================================================

/// A set of column names chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSelector(Vec<String>);

impl ColumnSelector {
    /// Build a selector; repeated names are kept once, first position wins.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !out.contains(&name) {
                out.push(name);
            }
        }
        Self(out)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve names to column positions, failing on the first unknown name.
    pub fn resolve(&self, table: &Table) -> Result<Vec<usize>, TransformError> {
        self.0
            .iter()
            .map(|name| {
                table
                    .column_index(name)
                    .ok_or_else(|| TransformError::ColumnNotFound(name.clone()))
            })
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ColumnSelector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0), None]),
            Column::text("b", vec![Some("x"), None, Some("z")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_table_shape() {
        let table = sample();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.row(1).unwrap(), vec![&Cell::Number(2.0), &Cell::Missing]);
        assert!(table.row(3).is_none());
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let err = Table::new(vec![
            Column::numeric("a", vec![Some(1.0)]),
            Column::numeric("b", vec![Some(1.0), Some(2.0)]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            TableError::RaggedColumn {
                column: "b".into(),
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Table::new(vec![
            Column::numeric("a", vec![]),
            Column::numeric("a", vec![]),
        ])
        .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".into()));
    }

    #[test]
    fn test_infer_numeric() {
        let col = Column::infer(
            "price",
            vec![
                RawCell::from_text("1.5"),
                RawCell::from_text("NA"),
                RawCell::Number(3.0),
            ],
        );
        assert_eq!(col.kind(), ColumnType::Numeric);
        assert_eq!(col.cells(), &[Cell::Number(1.5), Cell::Missing, Cell::Number(3.0)]);
    }

    #[test]
    fn test_infer_text_keeps_spelling() {
        let col = Column::infer(
            "code",
            vec![
                RawCell::from_text("007"),
                RawCell::from_text("abc"),
                RawCell::Number(2.0),
            ],
        );
        assert_eq!(col.kind(), ColumnType::Text);
        assert_eq!(
            col.cells(),
            &[
                Cell::Text("007".into()),
                Cell::Text("abc".into()),
                Cell::Text("2".into())
            ]
        );
    }

    #[test]
    fn test_infer_all_missing_is_numeric() {
        let col = Column::infer("empty", vec![RawCell::Missing, RawCell::from_text("")]);
        assert!(col.is_numeric());
        assert_eq!(col.missing_count(), 2);
    }

    #[test]
    fn test_infinity_is_text() {
        let col = Column::infer("x", vec![RawCell::from_text("inf")]);
        assert_eq!(col.kind(), ColumnType::Text);
    }

    #[test]
    fn test_head() {
        let head = sample().head(2);
        assert_eq!(head.row_count(), 2);
        assert_eq!(sample().head(10).row_count(), 3);
    }

    #[test]
    fn test_selector_resolve() {
        let table = sample();
        let selector = ColumnSelector::new(["b", "a", "b"]);
        assert_eq!(selector.names(), &["b".to_string(), "a".to_string()]);
        assert_eq!(selector.resolve(&table).unwrap(), vec![1, 0]);

        let missing = ColumnSelector::new(["a", "zzz"]);
        assert_eq!(
            missing.resolve(&table),
            Err(TransformError::ColumnNotFound("zzz".into()))
        );
    }

    #[test]
    fn test_cell_display_and_json() {
        assert_eq!(Cell::Number(1.0).to_string(), "1");
        assert_eq!(Cell::Number(0.25).to_string(), "0.25");
        assert_eq!(Cell::Missing.to_string(), "");
        assert_eq!(Cell::Missing.to_json(), Value::Null);
        assert_eq!(Cell::Text("hi".into()).to_json(), Value::String("hi".into()));
    }

    #[test]
    fn test_negative_zero_key() {
        assert_eq!(Cell::Number(-0.0).key(), Cell::Number(0.0).key());
    }
}
