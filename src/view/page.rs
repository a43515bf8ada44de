use async_graphql::SimpleObject;

/// Page sizes a client may ask for.
pub(crate) const PAGE_SIZES: [usize; 3] = [10, 25, 50];
pub(crate) const DEFAULT_PAGE_SIZE: usize = 10;

/// A normalized pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageRequest {
    page: usize,
    page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Absent or out-of-range values fall back to page 1 and the default
    /// size instead of failing.
    pub(crate) fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page
            .and_then(|p| usize::try_from(p).ok())
            .filter(|&p| p >= 1)
            .unwrap_or(1);
        let page_size = page_size
            .and_then(|s| usize::try_from(s).ok())
            .filter(|s| PAGE_SIZES.contains(s))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self { page, page_size }
    }

    /// Cuts the requested page out of `items`, clamping the page number into
    /// the available range.
    pub(crate) fn window<'a, T>(&self, items: &'a [T]) -> (&'a [T], PageInfo) {
        let total_rows = items.len();
        let total_pages = total_rows.div_ceil(self.page_size).max(1);
        let page = self.page.clamp(1, total_pages);
        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(total_rows);
        let info = PageInfo {
            page,
            per_page: self.page_size,
            total_pages,
            total_rows,
            start_row: start + 1,
            end_row: end,
        };
        (&items[start..end], info)
    }
}

/// Where a page sits in the filtered sequence. Row bounds are 1-based and
/// inclusive; `start_row > end_row` only for an empty sequence.
#[derive(SimpleObject, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageInfo {
    pub(crate) page: usize,
    pub(crate) per_page: usize,
    pub(crate) total_pages: usize,
    pub(crate) total_rows: usize,
    pub(crate) start_row: usize,
    pub(crate) end_row: usize,
}

impl PageInfo {
    /// The 0-based offset of the page's first row.
    pub(crate) fn offset(&self) -> usize {
        self.start_row - 1
    }

    /// "1-10 of 23 rows", or "0 rows" for an empty sequence.
    pub(crate) fn summary(&self) -> String {
        if self.total_rows == 0 {
            "0 rows".to_string()
        } else {
            format!(
                "{}-{} of {} rows",
                self.start_row, self.end_row, self.total_rows
            )
        }
    }
}
