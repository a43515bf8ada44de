use std::collections::HashMap;

use crate::record::Record;

/// Occurrence counts of one field's values, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Frequency {
    entries: Vec<(String, usize)>,
    total: usize,
}

impl Frequency {
    /// Counts the display value of `field` over `records`; records without
    /// the field count as `"Unknown"`.
    pub(crate) fn count(records: &[Record], field: &str) -> Self {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut entries: Vec<(String, usize)> = Vec::new();
        for record in records {
            let value = record.field(field);
            if let Some(&pos) = positions.get(&value) {
                entries[pos].1 += 1;
            } else {
                positions.insert(value.clone(), entries.len());
                entries.push((value, 1));
            }
        }
        Self {
            entries,
            total: records.len(),
        }
    }

    pub(crate) fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    /// Share of each entry in percent, unrounded.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn percentages(&self) -> Vec<f64> {
        self.entries
            .iter()
            .map(|(_, count)| *count as f64 / self.total as f64 * 100.0)
            .collect()
    }
}

/// Rounds a percentage to one decimal place for display.
pub(crate) fn round_percentage(p: f64) -> f64 {
    (p * 10.0).round() / 10.0
}
