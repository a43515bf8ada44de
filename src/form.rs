use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::record::{form_value, Record};

pub(crate) const QUERY_PREFIX: &str = "query";
pub(crate) const METADATA_PREFIX: &str = "metadata";

/// The editable fields of a dataset: every key seen in any record's first
/// query mapping and metadata, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FieldSet {
    pub(crate) query: Vec<String>,
    pub(crate) metadata: Vec<String>,
}

impl FieldSet {
    pub(crate) fn of(records: &[Record]) -> Self {
        let mut query = BTreeSet::new();
        let mut metadata = BTreeSet::new();
        for record in records {
            if let Some(head) = record.query_head() {
                query.extend(head.keys().cloned());
            }
            metadata.extend(record.metadata.keys().cloned());
        }
        Self {
            query: query.into_iter().collect(),
            metadata: metadata.into_iter().collect(),
        }
    }

    /// Current values of `record` for every field, blank where it has none.
    pub(crate) fn values(&self, record: &Record) -> (Vec<(String, String)>, Vec<(String, String)>) {
        let empty = Map::new();
        let head = record.query_head().unwrap_or(&empty);
        (
            prefill(&self.query, head),
            prefill(&self.metadata, &record.metadata),
        )
    }
}

fn prefill(fields: &[String], values: &Map<String, Value>) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|field| {
            let value = values.get(field).map(form_value).unwrap_or_default();
            (field.clone(), value)
        })
        .collect()
}

/// A submitted form keyed by `query_<field>` / `metadata_<field>`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Form {
    entries: HashMap<String, String>,
}

impl Form {
    pub(crate) fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Collects the values submitted for `fields` under `prefix`.
    pub(crate) fn mapping(&self, prefix: &str, fields: &[String]) -> Map<String, Value> {
        fields
            .iter()
            .map(|field| {
                let raw = self
                    .entries
                    .get(&format!("{prefix}_{field}"))
                    .map_or("", String::as_str);
                (field.clone(), parse_value(raw))
            })
            .collect()
    }

    /// Builds a record holding exactly the fields of `fields`.
    pub(crate) fn record(&self, fields: &FieldSet) -> Record {
        Record::new(
            self.mapping(QUERY_PREFIX, &fields.query),
            self.mapping(METADATA_PREFIX, &fields.metadata),
        )
    }
}

/// Blank input is an empty string; otherwise JSON if it parses, the trimmed
/// text if it does not.
fn parse_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}
