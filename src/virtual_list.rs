//! Viewport virtualization for the product listing.
//!
//! Computes which rows of a growing product sequence to render, and decides
//! when the listing should ask for another page. It owns no data and does no
//! I/O: callers feed it the loaded length and fetch state, and act on the
//! returned [`Frame`].
use std::ops::Range;

pub const OVERSCAN_ROWS: usize = 5;
/// Rows from the end of the loaded sequence at which the next page is requested.
pub const FETCH_THRESHOLD_ROWS: usize = 3;

pub const GRID_ROW_ESTIMATE: f64 = 180.0;
pub const LIST_ROW_ESTIMATE: f64 = 90.0;

pub const GRID_SKELETONS: usize = 6;
pub const LIST_SKELETONS: usize = 8;

const TWO_COLUMN_WIDTH: f64 = 640.0;
const THREE_COLUMN_WIDTH: f64 = 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn columns(self, viewport_width: f64) -> usize {
        match self {
            ViewMode::List => 1,
            ViewMode::Grid if viewport_width < TWO_COLUMN_WIDTH => 1,
            ViewMode::Grid if viewport_width < THREE_COLUMN_WIDTH => 2,
            ViewMode::Grid => 3,
        }
    }

    /// Estimate used for scroll math only; real rows may be taller.
    pub fn row_estimate(self) -> f64 {
        match self {
            ViewMode::Grid => GRID_ROW_ESTIMATE,
            ViewMode::List => LIST_ROW_ESTIMATE,
        }
    }

    pub fn skeletons(self) -> usize {
        match self {
            ViewMode::Grid => GRID_SKELETONS,
            ViewMode::List => LIST_SKELETONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchState {
    pub is_loading: bool,
    pub has_next_page: bool,
    pub is_fetching_next_page: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRow {
    pub index: usize,
    /// Item indexes laid out in this row.
    pub items: Range<usize>,
    /// Estimated distance from the top of the list.
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// First load in progress; fixed placeholders, not virtualized.
    Skeleton { count: usize },
    Rows {
        columns: usize,
        row_count: usize,
        total_height: f64,
        rows: Vec<VisibleRow>,
        /// Appended after the last row while the next page loads.
        trailing_loader: bool,
    },
    /// Nothing loaded and nothing loading; the caller shows its empty state.
    Empty,
}

#[derive(Debug, Clone)]
pub struct VirtualList {
    mode: ViewMode,
    viewport_width: f64,
    viewport_height: f64,
    scroll_top: f64,
    columns: usize,
    requested_at: Option<usize>,
    was_fetching: bool,
}

impl VirtualList {
    pub fn new(mode: ViewMode, viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            mode,
            viewport_width,
            viewport_height,
            scroll_top: 0.0,
            columns: mode.columns(viewport_width),
            requested_at: None,
            was_fetching: false,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
        self.columns = mode.columns(self.viewport_width);
    }

    pub fn resize(&mut self, viewport_width: f64, viewport_height: f64) {
        self.viewport_width = viewport_width;
        self.viewport_height = viewport_height;
        self.columns = self.mode.columns(viewport_width);
    }

    pub fn scroll_to(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top.max(0.0);
    }

    /// Forgets the fetch request for the current length. Call when the
    /// listing switches to another category or search.
    pub fn reset(&mut self) {
        self.requested_at = None;
        self.was_fetching = false;
    }

    pub fn row_count(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.columns)
    }

    /// Rows intersecting the viewport plus overscan on both sides.
    pub fn rendered_rows(&self, item_count: usize) -> Range<usize> {
        let row_count = self.row_count(item_count);
        let row_height = self.mode.row_estimate();

        let first = (self.scroll_top / row_height).floor() as usize;
        let last = ((self.scroll_top + self.viewport_height) / row_height).ceil() as usize;

        let start = first.saturating_sub(OVERSCAN_ROWS).min(row_count);
        let end = last.saturating_add(OVERSCAN_ROWS).min(row_count);

        start..end
    }

    /// Lays out the current viewport. The second value is true when the caller
    /// should request the next page now; it fires once per loaded length.
    pub fn frame(&mut self, item_count: usize, fetch: FetchState) -> (Frame, bool) {
        self.observe(item_count, fetch);

        if item_count == 0 {
            self.requested_at = None;

            let frame = if fetch.is_loading {
                Frame::Skeleton {
                    count: self.mode.skeletons(),
                }
            } else {
                Frame::Empty
            };

            return (frame, false);
        }

        let row_count = self.row_count(item_count);
        let row_height = self.mode.row_estimate();
        let range = self.rendered_rows(item_count);

        let rows = range
            .clone()
            .map(|index| VisibleRow {
                index,
                items: index * self.columns..((index + 1) * self.columns).min(item_count),
                offset: index as f64 * row_height,
            })
            .collect();

        let fetch_next = match range.end.checked_sub(1) {
            Some(last) => self.should_fetch(last, row_count, item_count, fetch),
            None => false,
        };

        let frame = Frame::Rows {
            columns: self.columns,
            row_count,
            total_height: row_count as f64 * row_height,
            rows,
            trailing_loader: fetch.is_fetching_next_page,
        };

        (frame, fetch_next)
    }

    /// Fetch trigger for a given last rendered row.
    pub fn should_fetch(
        &mut self,
        last_row: usize,
        row_count: usize,
        item_count: usize,
        fetch: FetchState,
    ) -> bool {
        self.observe(item_count, fetch);

        let near_end = last_row + FETCH_THRESHOLD_ROWS >= row_count;
        let already_requested = self.requested_at == Some(item_count);

        if near_end && fetch.has_next_page && !fetch.is_fetching_next_page && !already_requested {
            self.requested_at = Some(item_count);
            return true;
        }

        false
    }

    /// A fetch that settles without growing the sequence failed; allow
    /// another request at the same length.
    fn observe(&mut self, item_count: usize, fetch: FetchState) {
        if self.was_fetching
            && !fetch.is_fetching_next_page
            && self.requested_at == Some(item_count)
        {
            self.requested_at = None;
        }
        self.was_fetching = fetch.is_fetching_next_page;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle(has_next_page: bool) -> FetchState {
        FetchState {
            is_loading: false,
            has_next_page,
            is_fetching_next_page: false,
        }
    }

    #[test]
    fn test_grid_columns_follow_width() {
        let mut list = VirtualList::new(ViewMode::Grid, 500.0, 800.0);
        assert_eq!(list.columns(), 1);
        assert_eq!(list.row_count(250), 250);

        list.resize(1200.0, 800.0);
        assert_eq!(list.columns(), 3);
        assert_eq!(list.row_count(250), 84);

        list.resize(640.0, 800.0);
        assert_eq!(list.columns(), 2);
        list.resize(1023.0, 800.0);
        assert_eq!(list.columns(), 2);
        list.resize(1024.0, 800.0);
        assert_eq!(list.columns(), 3);
    }

    #[test]
    fn test_list_mode_single_column() {
        let mut list = VirtualList::new(ViewMode::List, 1400.0, 900.0);
        assert_eq!(list.columns(), 1);

        list.set_mode(ViewMode::Grid);
        assert_eq!(list.columns(), 3);
    }

    #[test]
    fn test_rendered_rows_with_overscan() {
        let mut list = VirtualList::new(ViewMode::List, 800.0, 900.0);

        assert_eq!(list.rendered_rows(250), 0..15);

        list.scroll_to(90.0 * 100.0);
        assert_eq!(list.rendered_rows(250), 95..115);

        list.scroll_to(90.0 * 1000.0);
        assert_eq!(list.rendered_rows(250), 250..250);

        list.scroll_to(f64::MAX);
        assert_eq!(list.rendered_rows(250), 250..250);
        list.scroll_to(f64::INFINITY);
        let (frame, _) = list.frame(250, idle(true));
        assert!(matches!(frame, Frame::Rows { ref rows, .. } if rows.is_empty()));
    }

    #[test]
    fn test_skeleton_and_empty() {
        let mut list = VirtualList::new(ViewMode::Grid, 1200.0, 800.0);
        let loading = FetchState {
            is_loading: true,
            ..idle(true)
        };
        assert_eq!(list.frame(0, loading).0, Frame::Skeleton { count: 6 });
        assert_eq!(list.frame(0, idle(false)).0, Frame::Empty);

        list.set_mode(ViewMode::List);
        assert_eq!(list.frame(0, loading).0, Frame::Skeleton { count: 8 });
    }

    #[test]
    fn test_grid_rows_cover_items() {
        let mut list = VirtualList::new(ViewMode::Grid, 1200.0, 400.0);

        let (frame, _) = list.frame(10, idle(false));
        let Frame::Rows { rows, row_count, .. } = frame else {
            panic!("expected rows");
        };

        assert_eq!(row_count, 4);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].items, 0..3);
        assert_eq!(rows[3].items, 9..10);
        assert_eq!(rows[2].offset, 360.0);
    }

    #[test]
    fn test_fetch_requested_once_near_end() {
        let mut list = VirtualList::new(ViewMode::List, 800.0, 900.0);

        assert!(!list.should_fetch(26, 30, 30, idle(true)));
        assert!(list.should_fetch(27, 30, 30, idle(true)));
        assert!(!list.should_fetch(28, 30, 30, idle(true)));
        assert!(!list.should_fetch(29, 30, 30, idle(true)));

        assert!(list.should_fetch(57, 60, 60, idle(true)));
    }

    #[test]
    fn test_fetch_not_requested_while_fetching_or_done() {
        let mut list = VirtualList::new(ViewMode::List, 800.0, 900.0);
        let fetching = FetchState {
            is_fetching_next_page: true,
            ..idle(true)
        };

        assert!(!list.should_fetch(29, 30, 30, fetching));
        assert!(!list.should_fetch(29, 30, 30, idle(false)));
    }

    #[test]
    fn test_failed_page_rearms_fetch() {
        let mut list = VirtualList::new(ViewMode::List, 800.0, 900.0);
        list.scroll_to(90.0 * 15.0);
        let fetching = FetchState {
            is_fetching_next_page: true,
            ..idle(true)
        };

        assert!(list.frame(30, idle(true)).1);
        assert!(!list.frame(30, fetching).1);
        assert!(list.frame(30, idle(true)).1);
        assert!(!list.frame(30, idle(true)).1);
    }

    #[test]
    fn test_loaded_page_does_not_refire_early() {
        let mut list = VirtualList::new(ViewMode::List, 800.0, 900.0);
        let fetching = FetchState {
            is_fetching_next_page: true,
            ..idle(true)
        };

        assert!(list.should_fetch(27, 30, 30, idle(true)));
        assert!(!list.should_fetch(27, 30, 30, fetching));
        assert!(!list.should_fetch(27, 60, 60, idle(true)));
        assert!(list.should_fetch(57, 60, 60, idle(true)));
    }

    #[test]
    fn test_reset_for_new_listing() {
        let mut list = VirtualList::new(ViewMode::List, 800.0, 900.0);
        list.scroll_to(90.0 * 15.0);

        assert!(list.frame(30, idle(true)).1);
        assert!(!list.frame(30, idle(true)).1);

        list.reset();
        assert!(list.frame(30, idle(true)).1);
    }

    #[test]
    fn test_frame_triggers_fetch_and_loader() {
        let mut list = VirtualList::new(ViewMode::List, 800.0, 900.0);

        let (_, fetch) = list.frame(30, idle(true));
        assert!(!fetch);

        list.scroll_to(90.0 * 15.0);
        let (_, fetch) = list.frame(30, idle(true));
        assert!(fetch);

        let fetching = FetchState {
            is_fetching_next_page: true,
            ..idle(true)
        };
        let (frame, fetch) = list.frame(30, fetching);
        assert!(!fetch);
        assert!(matches!(frame, Frame::Rows { trailing_loader: true, .. }));
    }
}
