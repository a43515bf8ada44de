use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

pub(crate) const QUESTION_INTENT: &str = "question_intent";
pub(crate) const SUB_INTENT: &str = "sub_intent";
pub(crate) const SEGMENT: &str = "segment";
pub(crate) const TEXT: &str = "text";

/// Stand-in for a metadata field a record does not carry.
pub(crate) const UNKNOWN: &str = "Unknown";
/// Stand-in for a record without display text.
pub(crate) const NO_TEXT: &str = "No text available";

/// One query/metadata pair, the unit of a dataset.
///
/// `query` is kept as the raw JSON value of the first column so that a
/// round trip through the TSV format never reshapes it. By convention it
/// is an array whose first element is the mapping shown and edited.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Record {
    pub(crate) query: Value,
    pub(crate) metadata: Map<String, Value>,
}

impl Record {
    pub(crate) fn new(query: Map<String, Value>, metadata: Map<String, Value>) -> Self {
        Self {
            query: Value::Array(vec![Value::Object(query)]),
            metadata,
        }
    }

    /// Parses one `<json(query)>\t<json(metadata)>` line.
    pub(crate) fn from_line(line: &str) -> Result<Self> {
        let columns: Vec<&str> = line.trim().split('\t').collect();
        if columns.len() != 2 {
            bail!("Invalid line format: expected 2 tab-separated columns, found {}", columns.len());
        }
        let query: Value =
            serde_json::from_str(columns[0]).context("Invalid JSON in query column")?;
        let metadata = match serde_json::from_str(columns[1])
            .context("Invalid JSON in metadata column")?
        {
            Value::Object(map) => map,
            other => bail!("Invalid metadata: expected a JSON object, found {other}"),
        };
        Ok(Self { query, metadata })
    }

    /// Serializes the record as one TSV line, including the trailing newline.
    pub(crate) fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(&self.query)?;
        line.push('\t');
        line.push_str(&serde_json::to_string(&self.metadata)?);
        line.push('\n');
        Ok(line)
    }

    /// The mapping of interest in `query`, if there is one.
    pub(crate) fn query_head(&self) -> Option<&Map<String, Value>> {
        self.query.get(0).and_then(Value::as_object)
    }

    /// Replaces the first query mapping wholesale.
    pub(crate) fn set_query_head(&mut self, head: Map<String, Value>) {
        match &mut self.query {
            Value::Array(items) if !items.is_empty() => items[0] = Value::Object(head),
            Value::Array(items) => items.push(Value::Object(head)),
            other => *other = Value::Array(vec![Value::Object(head)]),
        }
    }

    /// The display string of a metadata field, `"Unknown"` when absent.
    pub(crate) fn field(&self, name: &str) -> String {
        self.metadata
            .get(name)
            .map_or_else(|| UNKNOWN.to_string(), display_value)
    }

    /// The display text of the record.
    pub(crate) fn text(&self) -> String {
        self.query_head()
            .and_then(|head| head.get(TEXT))
            .map_or_else(|| NO_TEXT.to_string(), display_value)
    }
}

/// Converts a JSON value into the string used for display, filtering and
/// sorting.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders a value for an edit form: nested values as indented JSON.
pub(crate) fn form_value(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => display_value(other),
    }
}

/// Summarizes the first few records' metadata for debug logging.
pub(crate) fn sample_metadata(records: &[Record]) -> String {
    let mut out = String::new();
    for record in records.iter().take(3) {
        let _ = write!(out, "{} ", Value::Object(record.metadata.clone()));
    }
    out.trim_end().to_string()
}
