//! Distribution payloads for the chart views.
//!
//! Both are computed over the full record set; table filters, sorting and
//! pagination never apply here.

mod color;
pub(crate) mod cross_tab;
pub(crate) mod frequency;

use async_graphql::SimpleObject;
use tracing::info;

use self::{
    cross_tab::{BarLayout, CrossTab},
    frequency::{round_percentage, Frequency},
};
use crate::record::{Record, QUESTION_INTENT, SEGMENT, SUB_INTENT};

/// Pie chart data: how records split across segments.
#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub(crate) struct SegmentDistribution {
    pub(crate) labels: Vec<String>,
    pub(crate) values: Vec<usize>,
    pub(crate) colors: Vec<String>,
    /// Unrounded share of each label in percent.
    pub(crate) percentages: Vec<f64>,
    pub(crate) total: usize,
    pub(crate) slices: Vec<Slice>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub(crate) struct Slice {
    pub(crate) label: String,
    pub(crate) count: usize,
    /// Share in percent, rounded to one decimal place.
    pub(crate) percentage: f64,
    pub(crate) color: String,
}

/// Stacked bar chart data: sub intents stacked per question intent.
#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub(crate) struct IntentBreakdown {
    /// Question intents, the category axis.
    pub(crate) labels: Vec<String>,
    pub(crate) series: Vec<Series>,
    pub(crate) total: usize,
    pub(crate) layout: BarLayout,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Series {
    pub(crate) label: String,
    /// Counts aligned with the category axis.
    pub(crate) data: Vec<usize>,
    pub(crate) color: String,
}

pub(crate) fn segment_distribution(records: &[Record]) -> SegmentDistribution {
    info!("Generating segment pie chart data");
    let freq = Frequency::count(records, SEGMENT);
    let colors = color::palette(freq.entries().len());
    let percentages = freq.percentages();
    let slices = freq
        .entries()
        .iter()
        .zip(&percentages)
        .zip(&colors)
        .map(|(((label, count), percentage), color)| Slice {
            label: label.clone(),
            count: *count,
            percentage: round_percentage(*percentage),
            color: color.clone(),
        })
        .collect();

    SegmentDistribution {
        labels: freq.entries().iter().map(|(l, _)| l.clone()).collect(),
        values: freq.entries().iter().map(|(_, c)| *c).collect(),
        colors,
        percentages,
        total: freq.total(),
        slices,
    }
}

pub(crate) fn intent_breakdown(records: &[Record]) -> IntentBreakdown {
    info!("Generating stacked bar chart data");
    let tab = CrossTab::count(records, QUESTION_INTENT, SUB_INTENT);
    let colors = color::palette(tab.series.len());
    let series = tab
        .series
        .iter()
        .zip(&tab.counts)
        .zip(colors)
        .map(|((label, data), color)| Series {
            label: label.clone(),
            data: data.clone(),
            color,
        })
        .collect();

    IntentBreakdown {
        labels: tab.categories.clone(),
        series,
        total: tab.total(),
        layout: tab.layout(),
    }
}
