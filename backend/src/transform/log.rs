//! Transform log: the user-facing record of what a pipeline run did.
//!
//! Append-only and scoped to one run. This is separate from the operational
//! log stream in [`crate::api::logs`].

use serde::Serialize;
use serde_json::Value;

/// What an operation touched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Affected {
    /// Number of rows added or removed.
    Rows(usize),
    /// Names of the columns that were changed.
    Columns(Vec<String>),
}

/// One applied operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Operation name, e.g. `deduplicate`
    pub operation: String,
    /// Operation parameters as given by the caller
    pub parameters: Value,
    /// Rows or columns affected
    pub affected: Affected,
    /// Soft failures (degenerate statistics)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl LogRecord {
    pub fn new(operation: impl Into<String>, parameters: Value, affected: Affected) -> Self {
        Self {
            operation: operation.into(),
            parameters,
            affected,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// One-line, human-readable description.
    pub fn describe(&self) -> String {
        let affected = match &self.affected {
            Affected::Rows(n) => format!("{} row(s)", n),
            Affected::Columns(cols) if cols.is_empty() => "no columns".to_string(),
            Affected::Columns(cols) => format!("columns [{}]", cols.join(", ")),
        };
        format!("{}: {}", self.operation, affected)
    }
}

/// Ordered, append-only list of [`LogRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TransformLog {
    records: Vec<LogRecord>,
}

impl TransformLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All warnings across records, in order.
    pub fn warnings(&self) -> impl Iterator<Item = &str> + '_ {
        self.records
            .iter()
            .flat_map(|r| r.warnings.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_is_ordered() {
        let mut log = TransformLog::new();
        log.push(LogRecord::new("deduplicate", json!({}), Affected::Rows(2)));
        log.push(
            LogRecord::new("fill_missing", json!({}), Affected::Columns(vec![]))
                .with_warning("column 'x' has no values"),
        );

        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].operation, "deduplicate");
        assert_eq!(log.warnings().collect::<Vec<_>>(), vec!["column 'x' has no values"]);
    }

    #[test]
    fn test_describe() {
        let rec = LogRecord::new(
            "normalize",
            json!({"columns": ["a", "b"]}),
            Affected::Columns(vec!["a".into(), "b".into()]),
        );
        assert_eq!(rec.describe(), "normalize: columns [a, b]");
        let rec = LogRecord::new("deduplicate", json!({}), Affected::Rows(1));
        assert_eq!(rec.describe(), "deduplicate: 1 row(s)");
    }

    #[test]
    fn test_serialization() {
        let rec = LogRecord::new("deduplicate", json!({}), Affected::Rows(3));
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["affected"]["kind"], "rows");
        assert_eq!(value["affected"]["value"], 3);
        assert!(value.get("warnings").is_none());
    }
}
