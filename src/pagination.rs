//! Page-number bound for the leads table
//!
//! Requests are clamped into `1..=total_pages` of the last page the server
//! reported, before any fetch is issued. Until a page has loaded only the
//! lower bound applies.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    current: u32,
    total_pages: Option<u32>,
}

impl Default for Pager {
    fn default() -> Self {
        Self {
            current: 1,
            total_pages: None,
        }
    }
}

impl Pager {
    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    fn clamp(&self, page: u32) -> u32 {
        page.clamp(1, self.total_pages.unwrap_or(u32::MAX))
    }

    /// Record the page count from the latest page response
    ///
    /// Re-clamps the current page if the list shrank.
    pub fn set_total_pages(&mut self, total_pages: u32) {
        self.total_pages = Some(total_pages.max(1));
        self.current = self.clamp(self.current);
    }

    /// Move to `page`, clamped. Returns the page to fetch.
    pub fn go_to(&mut self, page: u32) -> u32 {
        self.current = self.clamp(page);
        self.current
    }

    pub fn next(&mut self) -> u32 {
        self.go_to(self.current.saturating_add(1))
    }

    pub fn prev(&mut self) -> u32 {
        self.go_to(self.current.saturating_sub(1))
    }

    pub fn has_next(&self) -> bool {
        self.total_pages.map_or(true, |total| self.current < total)
    }

    pub fn has_prev(&self) -> bool {
        self.current > 1
    }
}
