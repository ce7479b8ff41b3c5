use crate::services::result_pipeline::CategoryFilter;

/// Windowing state for the results grid: everything is already fetched
/// and filtered, this only bounds how much of it renders. Grows a page
/// at a time as the trailing sentinel scrolls into view and snaps back
/// whenever the filter changes shape.
#[derive(Debug)]
pub struct RevealFlow {
    page_size: usize,
    visible: usize,
    last_filter: Option<(String, CategoryFilter)>,
}

impl RevealFlow {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            visible: page_size,
            last_filter: None,
        }
    }

    /// Re-arm the window when the search term or category changed since
    /// the last frame.
    pub fn sync_filter(&mut self, search_term: &str, category: CategoryFilter) {
        let key = (search_term.to_string(), category);
        if self.last_filter.as_ref() != Some(&key) {
            self.visible = self.page_size;
            self.last_filter = Some(key);
        }
    }

    pub fn advance(&mut self) {
        self.visible = self.visible.saturating_add(self.page_size);
    }

    /// How many of `total` items to render; never more than exist.
    pub fn visible_count(&self, total: usize) -> usize {
        self.visible.min(total)
    }

    /// Terminal state: no sentinel is rendered once everything shows.
    pub fn fully_revealed(&self, total: usize) -> bool {
        self.visible >= total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_grows_by_page_and_never_exceeds_total() {
        let mut flow = RevealFlow::new(12);
        assert_eq!(flow.visible_count(30), 12);
        assert!(!flow.fully_revealed(30));

        flow.advance();
        assert_eq!(flow.visible_count(30), 24);

        flow.advance();
        assert_eq!(flow.visible_count(30), 30);
        assert!(flow.fully_revealed(30));
    }

    #[test]
    fn short_lists_are_fully_revealed_from_the_start() {
        let flow = RevealFlow::new(12);
        assert_eq!(flow.visible_count(5), 5);
        assert!(flow.fully_revealed(5));
    }

    #[test]
    fn filter_change_resets_the_window() {
        let mut flow = RevealFlow::new(12);
        flow.sync_filter("", CategoryFilter::All);
        flow.advance();
        assert_eq!(flow.visible_count(100), 24);

        // Same filter, no reset.
        flow.sync_filter("", CategoryFilter::All);
        assert_eq!(flow.visible_count(100), 24);

        flow.sync_filter("alice", CategoryFilter::All);
        assert_eq!(flow.visible_count(100), 12);

        flow.advance();
        flow.sync_filter("alice", CategoryFilter::Group);
        assert_eq!(flow.visible_count(100), 12);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let flow = RevealFlow::new(0);
        assert_eq!(flow.visible_count(10), 1);
    }
}
