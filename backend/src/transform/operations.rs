//! Table transform operations.
//!
//! Every operation borrows the input table and returns a new one together
//! with a [`LogRecord`]; the input is never modified.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::log::{Affected, LogRecord};
use crate::error::{TransformError, TransformResult, UndefinedStatistic};
use crate::models::{Cell, CellKey, ColumnSelector, Table};

/// A table plus the log record describing how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub table: Table,
    pub record: LogRecord,
}

/// All available transform operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Drop rows identical to an earlier row
    Deduplicate,

    /// Replace missing numeric cells with the column mean
    FillMissing,

    /// Min-max scale the selected numeric columns to [0, 1]
    Normalize { columns: ColumnSelector },
}

impl Operation {
    /// Convenience constructor for [`Operation::Normalize`].
    pub fn normalize<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Operation::Normalize {
            columns: ColumnSelector::new(columns),
        }
    }

    /// Operation name as used in logs and JSON.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Deduplicate => "deduplicate",
            Operation::FillMissing => "fill_missing",
            Operation::Normalize { .. } => "normalize",
        }
    }

    /// Apply this operation to a table
    pub fn apply(&self, table: &Table) -> TransformResult<Applied> {
        match self {
            Operation::Deduplicate => Ok(deduplicate(table)),
            Operation::FillMissing => Ok(fill_missing(table)),
            Operation::Normalize { columns } => normalize(table, columns),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Normalize { columns } => {
                write!(f, "normalize={}", columns.names().join(","))
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Parses the CLI spelling: `dedup`, `fill-missing`, `normalize=a,b`.
impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, args) = match s.split_once('=') {
            Some((head, args)) => (head.trim(), Some(args)),
            None => (s.trim(), None),
        };

        match (head.to_lowercase().replace('-', "_").as_str(), args) {
            ("dedup" | "deduplicate", None) => Ok(Operation::Deduplicate),
            ("fill" | "fill_missing", None) => Ok(Operation::FillMissing),
            ("normalize", Some(args)) => {
                let columns: ColumnSelector = args
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .collect();
                if columns.is_empty() {
                    return Err("normalize needs at least one column: normalize=col1,col2".into());
                }
                Ok(Operation::Normalize { columns })
            }
            ("normalize", None) => {
                Err("normalize needs at least one column: normalize=col1,col2".into())
            }
            _ => Err(format!(
                "unknown operation '{}' (expected dedup, fill-missing or normalize=cols)",
                s
            )),
        }
    }
}

// =============================================================================
// Deduplicate
// =============================================================================

/// Remove rows that duplicate an earlier row across all columns.
///
/// Keeps the first occurrence and the relative order of kept rows.
pub fn deduplicate(table: &Table) -> Applied {
    let mut seen: HashSet<Vec<CellKey>> = HashSet::with_capacity(table.row_count());
    let keep: Vec<usize> = table
        .rows()
        .enumerate()
        .filter_map(|(idx, row)| {
            let key: Vec<CellKey> = row.iter().map(|c| c.key()).collect();
            seen.insert(key).then_some(idx)
        })
        .collect();

    let removed = table.row_count() - keep.len();
    Applied {
        table: table.select_rows(&keep),
        record: LogRecord::new("deduplicate", json!({}), Affected::Rows(removed)),
    }
}

// =============================================================================
// Fill Missing
// =============================================================================

/// Arithmetic mean of the non-missing values, `None` when there are none.
///
/// Falls back to a running mean when the plain sum overflows, so the result
/// stays finite for finite inputs.
pub fn mean(values: impl Iterator<Item = f64> + Clone) -> Option<f64> {
    let (sum, count) = values
        .clone()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        return None;
    }
    if sum.is_finite() {
        return Some(sum / count as f64);
    }
    let running = values.enumerate().fold(0.0, |m: f64, (i, v)| {
        let k = (i + 1) as f64;
        m - m / k + v / k
    });
    Some(running)
}

/// Fill missing cells of every numeric column with that column's mean.
///
/// The mean is taken before any replacement. Columns without values are left
/// as they are and reported as warnings; text columns are not touched.
pub fn fill_missing(table: &Table) -> Applied {
    let mut result = table.clone();
    let mut filled_columns = Vec::new();
    let mut filled_cells = 0usize;
    let mut warnings = Vec::new();

    for (idx, column) in table.columns().iter().enumerate() {
        if !column.is_numeric() {
            continue;
        }
        let missing = column.missing_count();
        if missing == 0 {
            continue;
        }

        let Some(fill) = mean(column.values()) else {
            warnings.push(UndefinedStatistic::Mean(column.name().to_string()).to_string());
            continue;
        };

        let cells = column
            .cells()
            .iter()
            .map(|c| if c.is_missing() { Cell::Number(fill) } else { c.clone() })
            .collect();
        result = result.replace_column(idx, column.with_cells(cells));
        filled_columns.push(column.name().to_string());
        filled_cells += missing;
    }

    let mut record = LogRecord::new(
        "fill_missing",
        json!({ "strategy": "mean", "cells_filled": filled_cells }),
        Affected::Columns(filled_columns),
    );
    for warning in warnings {
        record = record.with_warning(warning);
    }

    Applied { table: result, record }
}

// =============================================================================
// Normalize
// =============================================================================

/// Min-max scale each selected column independently.
///
/// Missing cells stay missing and do not take part in min/max. A constant
/// column maps to 0. Unknown or text columns fail the whole operation.
pub fn normalize(table: &Table, selector: &ColumnSelector) -> TransformResult<Applied> {
    let indices = selector.resolve(table)?;
    if let Some(&bad) = indices.iter().find(|&&i| !table.columns()[i].is_numeric()) {
        return Err(TransformError::NotNumeric(
            table.columns()[bad].name().to_string(),
        ));
    }

    let mut result = table.clone();
    let mut warnings = Vec::new();
    let mut scaled = Vec::with_capacity(indices.len());

    for &idx in &indices {
        let column = &table.columns()[idx];
        let Some((min, max)) = min_max(column.values()) else {
            warnings.push(UndefinedStatistic::EmptyRange(column.name().to_string()).to_string());
            continue;
        };
        // Halved operands keep `max - min` finite for any finite pair
        let (half_min, half_range) = (min / 2.0, max / 2.0 - min / 2.0);
        if half_range == 0.0 {
            warnings.push(UndefinedStatistic::ZeroRange(column.name().to_string()).to_string());
        }

        let cells = column
            .cells()
            .iter()
            .map(|c| match c {
                Cell::Number(_) if half_range == 0.0 => Cell::Number(0.0),
                Cell::Number(v) => Cell::Number((v / 2.0 - half_min) / half_range),
                other => other.clone(),
            })
            .collect();
        result = result.replace_column(idx, column.with_cells(cells));
        scaled.push(column.name().to_string());
    }

    let mut record = LogRecord::new(
        "normalize",
        json!({ "columns": selector.names() }),
        Affected::Columns(scaled),
    );
    for warning in warnings {
        record = record.with_warning(warning);
    }

    Ok(Applied { table: result, record })
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

// =============================================================================
// Summary stats (chart data)
// =============================================================================

/// Values of one numeric column, ready for a chart renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Data for the summary chart: the first two numeric columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartData {
    pub series: Vec<Series>,
}

/// Full values of the first two numeric columns, in encounter order.
pub fn chart_series(table: &Table) -> ChartData {
    let series = table
        .numeric_columns()
        .take(2)
        .map(|c| Series {
            name: c.name().to_string(),
            values: c.cells().iter().map(Cell::as_number).collect(),
        })
        .collect();
    ChartData { series }
}

/// Human-readable list of operations.
pub fn operations_description() -> String {
    r#"Available transform operations:

| Operation | CLI spelling | Description |
|-----------|--------------|-------------|
| deduplicate | dedup | Drop rows identical to an earlier row (first kept) |
| fill_missing | fill-missing | Replace missing numeric cells with the column mean |
| normalize | normalize=col1,col2 | Min-max scale numeric columns to [0, 1] |

Operations run in the order given; each one sees the previous result.

Example operations in JSON:
[
  {"type": "deduplicate"},
  {"type": "fill_missing"},
  {"type": "normalize", "columns": ["price", "quantity"]}
]"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    fn table(columns: Vec<Column>) -> Table {
        Table::new(columns).unwrap()
    }

    fn numbers(t: &Table, name: &str) -> Vec<Option<f64>> {
        t.column(name).unwrap().cells().iter().map(Cell::as_number).collect()
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let t = table(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0), Some(1.0), Some(3.0), Some(2.0)]),
            Column::text("b", vec![Some("x"), Some("y"), Some("x"), Some("x"), Some("z")]),
        ]);
        let applied = deduplicate(&t);

        assert_eq!(applied.table.row_count(), 4);
        assert_eq!(numbers(&applied.table, "a"), vec![Some(1.0), Some(2.0), Some(3.0), Some(2.0)]);
        assert_eq!(applied.record.affected, Affected::Rows(1));
    }

    #[test]
    fn test_deduplicate_missing_equals_missing() {
        let t = table(vec![Column::numeric("a", vec![None, None, Some(1.0)])]);
        assert_eq!(deduplicate(&t).table.row_count(), 2);
    }

    #[test]
    fn test_deduplicate_idempotent_and_subset() {
        let t = table(vec![
            Column::numeric("a", vec![Some(1.0), Some(1.0), None, None, Some(4.0)]),
            Column::text("b", vec![Some("p"), Some("p"), None, None, Some("p")]),
        ]);
        let once = deduplicate(&t).table;
        let twice = deduplicate(&once).table;

        assert_eq!(once, twice);
        assert!(once.row_count() <= t.row_count());
        let original: Vec<_> = t.rows().collect();
        for row in once.rows() {
            assert!(original.contains(&row));
        }
    }

    #[test]
    fn test_deduplicate_does_not_touch_input() {
        let t = table(vec![Column::numeric("a", vec![Some(1.0), Some(1.0)])]);
        let _ = deduplicate(&t);
        assert_eq!(t.row_count(), 2);
    }

    #[test]
    fn test_fill_missing_uses_pre_fill_mean() {
        let t = table(vec![
            Column::numeric("a", vec![Some(1.0), None, Some(5.0), None]),
            Column::text("t", vec![Some("x"), None, None, Some("y")]),
        ]);
        let applied = fill_missing(&t);

        assert_eq!(
            numbers(&applied.table, "a"),
            vec![Some(1.0), Some(3.0), Some(5.0), Some(3.0)]
        );
        // text columns are untouched
        assert_eq!(applied.table.column("t"), t.column("t"));
        assert_eq!(applied.record.affected, Affected::Columns(vec!["a".into()]));
        assert_eq!(applied.record.parameters["cells_filled"], 2);
        assert!(applied.record.warnings.is_empty());
    }

    #[test]
    fn test_fill_missing_all_missing_column_logged() {
        let t = table(vec![
            Column::numeric("empty", vec![None, None]),
            Column::numeric("b", vec![Some(2.0), None]),
        ]);
        let applied = fill_missing(&t);

        assert_eq!(applied.table.column("empty"), t.column("empty"));
        assert_eq!(numbers(&applied.table, "b"), vec![Some(2.0), Some(2.0)]);
        assert_eq!(applied.record.warnings.len(), 1);
        assert!(applied.record.warnings[0].contains("empty"));
    }

    #[test]
    fn test_fill_missing_large_values_stay_finite() {
        let t = table(vec![Column::numeric("big", vec![Some(1.7e308), Some(1.7e308), None])]);
        let applied = fill_missing(&t);

        assert_eq!(
            numbers(&applied.table, "big"),
            vec![Some(1.7e308), Some(1.7e308), Some(1.7e308)]
        );
    }

    #[test]
    fn test_normalize_min_max() {
        let t = table(vec![Column::numeric("a", vec![Some(2.0), None, Some(4.0), Some(3.0)])]);
        let applied = normalize(&t, &ColumnSelector::new(["a"])).unwrap();

        assert_eq!(
            numbers(&applied.table, "a"),
            vec![Some(0.0), None, Some(1.0), Some(0.5)]
        );
        assert!(applied.table.column("a").unwrap().cells()[1].is_missing());
    }

    #[test]
    fn test_normalize_constant_column() {
        let t = table(vec![Column::numeric("c", vec![Some(7.0), Some(7.0), None])]);
        let applied = normalize(&t, &ColumnSelector::new(["c"])).unwrap();

        assert_eq!(numbers(&applied.table, "c"), vec![Some(0.0), Some(0.0), None]);
        assert_eq!(applied.record.warnings.len(), 1);
    }

    #[test]
    fn test_normalize_extreme_range() {
        let t = table(vec![Column::numeric("x", vec![Some(-1e308), Some(0.0), Some(1e308)])]);
        let applied = normalize(&t, &ColumnSelector::new(["x"])).unwrap();

        assert_eq!(numbers(&applied.table, "x"), vec![Some(0.0), Some(0.5), Some(1.0)]);
    }

    #[test]
    fn test_normalize_all_missing_column_logged() {
        let t = table(vec![
            Column::numeric("blank", vec![None, None]),
            Column::numeric("a", vec![Some(1.0), Some(3.0)]),
        ]);
        let applied = normalize(&t, &ColumnSelector::new(["blank", "a"])).unwrap();

        assert_eq!(applied.table.column("blank"), t.column("blank"));
        assert_eq!(applied.record.affected, Affected::Columns(vec!["a".into()]));
        assert_eq!(applied.record.warnings.len(), 1);
        assert!(applied.record.warnings[0].contains("blank"));
    }

    #[test]
    fn test_normalize_columns_independent() {
        let t = table(vec![
            Column::numeric("a", vec![Some(0.0), Some(10.0)]),
            Column::numeric("b", vec![Some(100.0), Some(200.0)]),
        ]);
        let applied = normalize(&t, &ColumnSelector::new(["a", "b"])).unwrap();

        assert_eq!(numbers(&applied.table, "a"), vec![Some(0.0), Some(1.0)]);
        assert_eq!(numbers(&applied.table, "b"), vec![Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_normalize_unknown_column() {
        let t = table(vec![Column::numeric("a", vec![Some(1.0)])]);
        let err = normalize(&t, &ColumnSelector::new(["a", "missing"])).unwrap_err();
        assert_eq!(err, TransformError::ColumnNotFound("missing".into()));
    }

    #[test]
    fn test_normalize_text_column() {
        let t = table(vec![Column::text("name", vec![Some("x")])]);
        let err = normalize(&t, &ColumnSelector::new(["name"])).unwrap_err();
        assert_eq!(err, TransformError::NotNumeric("name".into()));
    }

    #[test]
    fn test_chart_series_first_two_numeric() {
        let t = table(vec![
            Column::text("label", vec![Some("x"), Some("y")]),
            Column::numeric("a", vec![Some(1.0), None]),
            Column::numeric("b", vec![Some(2.0), Some(3.0)]),
            Column::numeric("c", vec![Some(9.0), Some(9.0)]),
        ]);
        let chart = chart_series(&t);

        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "a");
        assert_eq!(chart.series[0].values, vec![Some(1.0), None]);
        assert_eq!(chart.series[1].name, "b");
    }

    #[test]
    fn test_parse_operations() {
        assert_eq!("dedup".parse::<Operation>().unwrap(), Operation::Deduplicate);
        assert_eq!("fill-missing".parse::<Operation>().unwrap(), Operation::FillMissing);
        assert_eq!(
            "normalize=a, b".parse::<Operation>().unwrap(),
            Operation::normalize(["a", "b"])
        );
        assert!("normalize".parse::<Operation>().is_err());
        assert!("sort".parse::<Operation>().is_err());
    }

    #[test]
    fn test_operation_json() {
        let ops: Vec<Operation> = serde_json::from_str(
            r#"[{"type":"deduplicate"},{"type":"fill_missing"},{"type":"normalize","columns":["a"]}]"#,
        )
        .unwrap();
        assert_eq!(
            ops,
            vec![
                Operation::Deduplicate,
                Operation::FillMissing,
                Operation::normalize(["a"])
            ]
        );
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean([1.0, 2.0, 6.0].into_iter()), Some(3.0));
        assert_eq!(mean(std::iter::empty()), None);
        let big = mean([1e308, 1e308, 1e308].into_iter()).unwrap();
        assert!(big.is_finite() && (big - 1e308).abs() < 1e295);
    }
}
