use async_graphql::SimpleObject;

use crate::record::{Record, QUESTION_INTENT, SEGMENT, SUB_INTENT};

/// One flattened table row.
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Row {
    /// Position of the record in the dataset; the address for edits.
    pub(crate) index: usize,
    /// Position of the row in the filtered, sorted sequence. Only table
    /// pages have one; rows returned by an edit or an add leave it empty.
    pub(crate) row: Option<usize>,
    pub(crate) text: String,
    pub(crate) segment: String,
    pub(crate) question_intent: String,
    pub(crate) sub_intent: String,
}

impl Row {
    pub(crate) fn new(index: usize, row: Option<usize>, record: &Record) -> Self {
        Self {
            index,
            row,
            text: record.text(),
            segment: record.field(SEGMENT),
            question_intent: record.field(QUESTION_INTENT),
            sub_intent: record.field(SUB_INTENT),
        }
    }
}

/// Flattens a page window whose first row sits at `offset` in the filtered
/// sequence.
pub(crate) fn project(window: &[(usize, &Record)], offset: usize) -> Vec<Row> {
    window
        .iter()
        .enumerate()
        .map(|(local, (index, record))| Row::new(*index, Some(offset + local), record))
        .collect()
}
