use std::collections::{BTreeMap, BTreeSet};

use async_graphql::SimpleObject;

use crate::record::Record;

/// Segments at or below this share of the tallest bar get no in-bar label.
const LABEL_THRESHOLD: f64 = 0.05;

/// Joint counts of two fields.
///
/// `categories` and `series` are sorted; `counts[s][c]` is the number of
/// records whose series value is `series[s]` and whose category value is
/// `categories[c]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CrossTab {
    pub(crate) categories: Vec<String>,
    pub(crate) series: Vec<String>,
    pub(crate) counts: Vec<Vec<usize>>,
}

impl CrossTab {
    /// Tabulates `records` by the display values of `category` and `series`,
    /// counting absent fields as `"Unknown"`.
    pub(crate) fn count(records: &[Record], category: &str, series: &str) -> Self {
        let cells = records
            .iter()
            .fold(BTreeMap::<(String, String), usize>::new(), |mut acc, record| {
                *acc.entry((record.field(category), record.field(series)))
                    .or_insert(0) += 1;
                acc
            });

        let categories: Vec<String> = cells
            .keys()
            .map(|(c, _)| c.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let series: Vec<String> = cells
            .keys()
            .map(|(_, s)| s.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let counts = series
            .iter()
            .map(|s| {
                categories
                    .iter()
                    .map(|c| cells.get(&(c.clone(), s.clone())).copied().unwrap_or(0))
                    .collect()
            })
            .collect();

        Self {
            categories,
            series,
            counts,
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Height of each category's stacked bar.
    pub(crate) fn bar_heights(&self) -> Vec<usize> {
        (0..self.categories.len())
            .map(|c| self.counts.iter().map(|row| row[c]).sum())
            .collect()
    }

    /// Places in-bar labels on segments taller than 5% of the tallest bar
    /// and lists every series that never got one in the legend.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn layout(&self) -> BarLayout {
        let max_height = self.bar_heights().into_iter().max().unwrap_or(0);
        let threshold = LABEL_THRESHOLD * max_height as f64;
        let mut bottoms = vec![0usize; self.categories.len()];
        let mut labels = Vec::new();
        let mut legend = Vec::new();

        for (series, row) in self.series.iter().zip(&self.counts) {
            let mut labelled = false;
            for (c, &count) in row.iter().enumerate() {
                if count as f64 > threshold {
                    labels.push(SegmentLabel {
                        category: self.categories[c].clone(),
                        series: series.clone(),
                        count,
                        offset: bottoms[c] as f64 + count as f64 / 2.0,
                    });
                    labelled = true;
                }
                bottoms[c] += count;
            }
            if !labelled {
                legend.push(series.clone());
            }
        }

        BarLayout {
            max_height,
            labels,
            legend,
        }
    }
}

/// Where annotations go on a rendered stacked bar chart.
#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub(crate) struct BarLayout {
    /// Total height of the tallest bar.
    pub(crate) max_height: usize,
    /// In-bar labels, in drawing order.
    pub(crate) labels: Vec<SegmentLabel>,
    /// Series shown in the side legend because no segment of theirs was
    /// labelled.
    pub(crate) legend: Vec<String>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub(crate) struct SegmentLabel {
    pub(crate) category: String,
    pub(crate) series: String,
    pub(crate) count: usize,
    /// Vertical center of the segment, in counts from the axis.
    pub(crate) offset: f64,
}
