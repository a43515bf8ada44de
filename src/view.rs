//! The table pipeline: filter, sort, paginate, then flatten for display.

pub(crate) mod filter;
pub(crate) mod page;
pub(crate) mod sort;
pub(crate) mod table;

use tracing::{debug, info};

pub(crate) use self::{
    filter::Filter,
    page::{PageInfo, PageRequest},
    sort::{SortIndicator, SortState},
    table::Row,
};
use crate::record::{sample_metadata, Record};

/// What a client asks the table for.
#[derive(Debug, Clone, Default)]
pub(crate) struct TableQuery {
    pub(crate) filter: Filter,
    pub(crate) sort: Option<String>,
    pub(crate) page: PageRequest,
}

#[derive(Debug, Clone)]
pub(crate) struct TablePage {
    pub(crate) rows: Vec<Row>,
    pub(crate) info: PageInfo,
    pub(crate) total_rows: usize,
    pub(crate) sort_indicators: Vec<SortIndicator>,
}

/// Runs one table request against the full record set, updating the
/// caller's sort state.
pub(crate) fn table(records: &[Record], sort: &mut SortState, query: &TableQuery) -> TablePage {
    let mut filtered = query.filter.apply(records);
    info!("Filtered {} of {} rows", filtered.len(), records.len());
    if filtered.is_empty() && !records.is_empty() {
        debug!("Sample metadata (first 3 rows): {}", sample_metadata(records));
    }

    // Without a sortable column in the request the current order holds, so
    // paging does not lose or flip it.
    if !sort.sort(query.sort.as_deref(), &mut filtered) {
        sort.apply(&mut filtered);
    }
    let (window, info) = query.page.window(&filtered);
    TablePage {
        rows: table::project(window, info.offset()),
        info,
        total_rows: records.len(),
        sort_indicators: sort.indicators(),
    }
}
