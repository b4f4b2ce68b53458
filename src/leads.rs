//! Lead page cache
//!
//! Pages are cached per page number for the freshness window (2 minutes by
//! default). While a new page loads, the page already on screen stays
//! visible and the view is flagged as loading, so the table never blanks.
//!
//! Global indices always come from the `start_index` the server reported for
//! the displayed page. They are never derived from page number × page size.

use crate::clock::SharedClock;
use crate::error::ApiError;
use crate::model::Page;
use crate::query::{QueryCache, QueryPolicy};
use crate::transport::SharedApi;
use std::sync::{Mutex, MutexGuard};

/// What the leads table should render right now
#[derive(Debug, Clone)]
pub struct PageView {
    /// Page on screen (may lag `requested_page` while loading)
    pub page: Page,
    pub requested_page: u32,
    pub loading: bool,
    /// The displayed page is not the requested one
    pub showing_previous: bool,
    /// Error from the last settled fetch of the requested page
    pub error: Option<ApiError>,
}

struct Display {
    shown: Option<Page>,
    requested: u32,
    loading: bool,
    error: Option<ApiError>,
    /// Bumped on every `get_page`; only the newest request updates the display
    generation: u64,
}

pub struct LeadPageCache {
    api: SharedApi,
    cache: QueryCache<u32, Page>,
    display: Mutex<Display>,
}

impl LeadPageCache {
    pub fn new(api: SharedApi, policy: QueryPolicy, clock: SharedClock) -> Self {
        Self {
            api,
            cache: QueryCache::new(policy, clock),
            display: Mutex::new(Display {
                shown: None,
                requested: 1,
                loading: false,
                error: None,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Display> {
        self.display.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn view(&self) -> PageView {
        let display = self.lock();
        let page = display.shown.clone().unwrap_or_else(Page::empty);
        PageView {
            showing_previous: display.shown.is_some() && page.page != display.requested,
            page,
            requested_page: display.requested,
            loading: display.loading,
            error: display.error.clone(),
        }
    }

    /// Page currently on screen, if anything has loaded yet
    pub fn current(&self) -> Option<Page> {
        self.lock().shown.clone()
    }

    /// Request page `n` and wait for it to settle
    ///
    /// A page fetched within the freshness window is served without a network
    /// call. On failure the view falls back to the last copy of page `n`,
    /// then to whatever was already displayed, then to an empty page.
    pub async fn get_page(&self, n: u32) -> PageView {
        let n = n.max(1);

        if let Some(page) = self.cache.fresh(&n) {
            let mut display = self.lock();
            display.generation += 1;
            display.requested = n;
            display.loading = false;
            display.error = None;
            display.shown = Some(page);
            drop(display);
            tracing::trace!(page = n, "lead page served from cache");
            return self.view();
        }

        let generation = {
            let mut display = self.lock();
            display.generation += 1;
            display.requested = n;
            display.loading = true;
            display.generation
        };

        let outcome = self
            .cache
            .fetch(n, || {
                let api = self.api.clone();
                async move { api.leads(n).await }
            })
            .await;

        {
            let mut display = self.lock();
            if display.generation != generation {
                tracing::debug!(page = n, "page request overtaken by a newer one");
            } else if outcome.superseded && outcome.error.is_none() {
                // Another request for this page is still running and will settle the view
            } else {
                display.loading = false;
                match outcome.value {
                    Some(page) => display.shown = Some(page),
                    None if display.shown.is_none() => display.shown = Some(Page::empty()),
                    None => {}
                }
                if let Some(e) = &outcome.error {
                    tracing::warn!(page = n, error = %e, "Failed to load leads");
                } else if !outcome.from_cache {
                    tracing::debug!(page = n, attempts = outcome.attempts, "lead page loaded");
                }
                display.error = outcome.error;
            }
        }

        self.view()
    }

    /// Invalidate every cached page; the next request for any page refetches
    ///
    /// Must be called after anything that changes the server-side lead list.
    pub fn refresh(&self) {
        self.cache.invalidate_all();
    }

    /// Global index of `row` on the displayed page
    pub fn global_index(&self, row: usize) -> Option<u64> {
        self.lock().shown.as_ref().and_then(|page| page.global_index(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::sample_lead;
    use crate::testing::{default_page, FakeApi};
    use std::sync::Arc;
    use std::time::Duration;

    fn policy() -> QueryPolicy {
        QueryPolicy {
            stale_time: Duration::from_secs(120),
            retries: 2,
            retry_delay: Duration::ZERO,
        }
    }

    fn cache_with(api: Arc<FakeApi>) -> (Arc<LeadPageCache>, ManualClock) {
        let clock = ManualClock::new();
        let cache = LeadPageCache::new(api, policy(), Arc::new(clock.clone()));
        (Arc::new(cache), clock)
    }

    async fn wait_for_leads_call(api: &FakeApi, page: u32, n: usize) {
        while api.leads_calls(page) < n {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn empty_view_before_first_fetch() {
        let (cache, _clock) = cache_with(FakeApi::new());
        let view = cache.view();
        assert_eq!(view.page, Page::empty());
        assert!(!view.loading);
        assert!(!view.showing_previous);
        assert_eq!(cache.global_index(0), None);
    }

    #[tokio::test]
    async fn revisit_within_window_uses_cache() {
        let api = FakeApi::new();
        let (cache, clock) = cache_with(api.clone());

        cache.get_page(1).await;
        cache.get_page(2).await;
        clock.advance(Duration::from_secs(119));
        let view = cache.get_page(1).await;

        assert_eq!(view.page.page, 1);
        assert_eq!(api.leads_calls(1), 1);

        clock.advance(Duration::from_secs(2));
        cache.get_page(1).await;
        assert_eq!(api.leads_calls(1), 2);
    }

    #[tokio::test]
    async fn previous_page_stays_visible_while_loading() {
        let api = FakeApi::new();
        let (cache, _clock) = cache_with(api.clone());
        cache.get_page(1).await;

        let gate = api.hold_next_page(2);
        let pending = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_page(2).await })
        };
        wait_for_leads_call(&api, 2, 1).await;

        let view = cache.view();
        assert!(view.loading);
        assert!(view.showing_previous);
        assert_eq!(view.requested_page, 2);
        assert_eq!(view.page.page, 1);
        assert_eq!(view.page.leads.len(), 10);

        gate.add_permits(1);
        let view = pending.await.unwrap();
        assert!(!view.loading);
        assert!(!view.showing_previous);
        assert_eq!(view.page.start_index, 10);
    }

    #[tokio::test]
    async fn overtaken_request_does_not_replace_display() {
        let api = FakeApi::new();
        let (cache, _clock) = cache_with(api.clone());

        let gate = api.hold_next_page(2);
        let slow = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_page(2).await })
        };
        wait_for_leads_call(&api, 2, 1).await;

        cache.get_page(3).await;
        gate.add_permits(1);
        slow.await.unwrap();

        let view = cache.view();
        assert_eq!(view.page.page, 3);
        assert_eq!(view.requested_page, 3);
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn slow_fetch_of_same_page_cannot_clobber_newer_one() {
        let api = FakeApi::new();
        let mut stale = default_page(2);
        stale.leads.truncate(1);
        api.push_page(2, Ok(stale));
        let (cache, clock) = cache_with(api.clone());

        let gate = api.hold_next_page(2);
        let slow = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_page(2).await })
        };
        wait_for_leads_call(&api, 2, 1).await;

        clock.advance(Duration::from_secs(1));
        let fresh = cache.get_page(2).await;
        assert_eq!(fresh.page.leads.len(), 10);

        gate.add_permits(1);
        slow.await.unwrap();
        assert_eq!(cache.view().page.leads.len(), 10);
    }

    #[tokio::test]
    async fn failure_with_nothing_cached_shows_empty_page() {
        let api = FakeApi::new();
        for _ in 0..3 {
            api.push_page(1, Err(ApiError::Network("down".into())));
        }
        let (cache, _clock) = cache_with(api.clone());

        let view = cache.get_page(1).await;
        assert_eq!(api.leads_calls(1), 3);
        assert!(view.error.is_some());
        assert!(!view.loading);
        assert!(view.page.leads.is_empty());
        assert_eq!(view.page.total_pages, 1);
    }

    #[tokio::test]
    async fn failure_keeps_last_copy_of_page() {
        let api = FakeApi::new();
        let (cache, _clock) = cache_with(api.clone());
        cache.get_page(1).await;

        cache.refresh();
        for _ in 0..3 {
            api.push_page(1, Err(ApiError::Timeout));
        }
        let view = cache.get_page(1).await;
        assert!(matches!(view.error, Some(ApiError::Timeout)));
        assert_eq!(view.page.leads.len(), 10);
    }

    #[tokio::test]
    async fn refresh_invalidates_every_page() {
        let api = FakeApi::new();
        let (cache, _clock) = cache_with(api.clone());
        cache.get_page(1).await;
        cache.get_page(2).await;

        cache.refresh();
        cache.get_page(2).await;
        cache.get_page(1).await;
        assert_eq!(api.leads_calls(1), 2);
        assert_eq!(api.leads_calls(2), 2);
    }

    #[tokio::test]
    async fn global_index_trusts_server_start_index() {
        let api = FakeApi::new();
        // Server-side ordering need not line up with page * size
        api.push_page(
            2,
            Ok(Page {
                leads: (13..18).map(sample_lead).collect(),
                page: 2,
                total_pages: 5,
                start_index: 13,
                total_leads: 47,
            }),
        );
        let (cache, _clock) = cache_with(api.clone());

        cache.get_page(2).await;
        assert_eq!(cache.global_index(0), Some(13));
        assert_eq!(cache.global_index(4), Some(17));
        assert_eq!(cache.global_index(5), None);
    }
}
