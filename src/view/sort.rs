use std::cmp::Reverse;

use async_graphql::{Enum, SimpleObject};
use tracing::info;

use crate::record::{Record, QUESTION_INTENT, SUB_INTENT};

const ASCENDING: &str = " ▲";
const DESCENDING: &str = " ▼";

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortColumn {
    QuestionIntent,
    SubIntent,
}

impl SortColumn {
    pub(crate) const ALL: [Self; 2] = [Self::QuestionIntent, Self::SubIntent];

    /// Accepts the field name or the column title; anything else is not a
    /// sortable column.
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            QUESTION_INTENT | "Question Intent" => Some(Self::QuestionIntent),
            SUB_INTENT | "Sub Intent" => Some(Self::SubIntent),
            _ => None,
        }
    }

    pub(crate) fn field(self) -> &'static str {
        match self {
            Self::QuestionIntent => QUESTION_INTENT,
            Self::SubIntent => SUB_INTENT,
        }
    }

    pub(crate) fn title(self) -> &'static str {
        match self {
            Self::QuestionIntent => "Question Intent",
            Self::SubIntent => "Sub Intent",
        }
    }
}

/// The header decoration of one sortable column.
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub(crate) struct SortIndicator {
    pub(crate) column: SortColumn,
    pub(crate) title: String,
    pub(crate) indicator: String,
}

/// Which column the table is sorted by, and in which direction.
///
/// Requesting the active column again flips the direction; requesting a
/// different column sorts it ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SortState {
    active: Option<SortColumn>,
    reverse: bool,
}

impl SortState {
    pub(crate) fn active(&self) -> Option<SortColumn> {
        self.active
    }

    pub(crate) fn is_reverse(&self) -> bool {
        self.reverse
    }

    fn toggle(&mut self, column: SortColumn) {
        if self.active == Some(column) {
            self.reverse = !self.reverse;
        } else {
            self.active = Some(column);
            self.reverse = false;
        }
    }

    /// Sorts `rows` by the requested column, updating the state. Returns
    /// whether a sort happened.
    ///
    /// A request that names no sortable column leaves both the rows and the
    /// state untouched.
    pub(crate) fn sort(
        &mut self,
        requested: Option<&str>,
        rows: &mut [(usize, &Record)],
    ) -> bool {
        let Some(column) = requested.and_then(SortColumn::parse) else {
            return false;
        };
        self.toggle(column);
        info!("Sorting by {}, reverse={}", column.title(), self.reverse);
        self.apply(rows);
        true
    }

    /// Orders `rows` by the active column and direction, if any, without
    /// changing the state.
    pub(crate) fn apply(&self, rows: &mut [(usize, &Record)]) {
        let Some(column) = self.active else {
            return;
        };
        let field = column.field();
        if self.reverse {
            rows.sort_by_cached_key(|(_, record)| Reverse(record.field(field).to_lowercase()));
        } else {
            rows.sort_by_cached_key(|(_, record)| record.field(field).to_lowercase());
        }
    }

    pub(crate) fn indicator(&self, column: SortColumn) -> &'static str {
        match (self.active == Some(column), self.reverse) {
            (true, false) => ASCENDING,
            (true, true) => DESCENDING,
            (false, _) => "",
        }
    }

    pub(crate) fn indicators(&self) -> Vec<SortIndicator> {
        SortColumn::ALL
            .iter()
            .map(|&column| SortIndicator {
                column,
                title: column.title().to_string(),
                indicator: self.indicator(column).to_string(),
            })
            .collect()
    }
}
