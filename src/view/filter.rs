use crate::record::{Record, QUESTION_INTENT, SEGMENT, SUB_INTENT};

/// Case-insensitive substring constraints on the three searchable fields.
///
/// An empty pattern places no constraint on its field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Filter {
    question_intent: String,
    sub_intent: String,
    segment: String,
}

impl Filter {
    pub(crate) fn new(
        question_intent: Option<&str>,
        sub_intent: Option<&str>,
        segment: Option<&str>,
    ) -> Self {
        Self {
            question_intent: normalize(question_intent.unwrap_or_default()),
            sub_intent: normalize(sub_intent.unwrap_or_default()),
            segment: normalize(segment.unwrap_or_default()),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.question_intent.is_empty() && self.sub_intent.is_empty() && self.segment.is_empty()
    }

    pub(crate) fn matches(&self, record: &Record) -> bool {
        field_matches(record, QUESTION_INTENT, &self.question_intent)
            && field_matches(record, SUB_INTENT, &self.sub_intent)
            && field_matches(record, SEGMENT, &self.segment)
    }

    /// Keeps the matching records in their original order, each paired with
    /// its position in `records`.
    pub(crate) fn apply<'a>(&self, records: &'a [Record]) -> Vec<(usize, &'a Record)> {
        if self.is_empty() {
            return records.iter().enumerate().collect();
        }
        records
            .iter()
            .enumerate()
            .filter(|(_, record)| self.matches(record))
            .collect()
    }
}

fn normalize(pattern: &str) -> String {
    pattern.trim().to_lowercase()
}

fn field_matches(record: &Record, field: &str, pattern: &str) -> bool {
    pattern.is_empty() || normalize(&record.field(field)).contains(pattern)
}
