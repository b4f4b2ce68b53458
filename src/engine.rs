//! Dashboard engine - wires the caches, the dispatcher and the pager together
//!
//! ```text
//!                  ┌────────────────────┐
//!   keys / CLI ───→│     Dashboard      │
//!                  └─┬──────┬──────┬────┘
//!                    │      │      │
//!          ┌─────────┘      │      └──────────┐
//!          ▼                ▼                 ▼
//!   LeadPageCache    CampaignSelector    CallDispatcher ──refresh──→ StatusSynchronizer
//!     (+ Pager)                                                          ▲
//!                                                        poll loop ──────┘
//! ```
//!
//! Each component owns its state; the dashboard only sequences calls
//! between them. All components share one transport and one clock.

use crate::campaigns::CampaignSelector;
use crate::clock::SharedClock;
use crate::dispatch::{CallDispatcher, DispatchOutcome};
use crate::error::{DispatchError, ValidationError};
use crate::leads::{LeadPageCache, PageView};
use crate::model::Page;
use crate::pagination::Pager;
use crate::query::QueryPolicy;
use crate::status::{StatusPolicy, StatusSynchronizer};
use crate::transport::SharedApi;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Freshness, retry and polling settings for every component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub status: StatusPolicy,
    pub leads: QueryPolicy,
    pub campaigns: QueryPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            status: StatusPolicy::default(),
            leads: QueryPolicy {
                stale_time: Duration::from_secs(120),
                retries: 2,
                retry_delay: Duration::from_millis(1000),
            },
            campaigns: QueryPolicy {
                stale_time: Duration::from_secs(300),
                retries: 2,
                retry_delay: Duration::from_millis(1000),
            },
        }
    }
}

pub struct Dashboard {
    pub status: Arc<StatusSynchronizer>,
    pub leads: Arc<LeadPageCache>,
    pub campaigns: Arc<CampaignSelector>,
    pub dispatcher: Arc<CallDispatcher>,
    pager: Mutex<Pager>,
}

impl Dashboard {
    pub fn new(api: SharedApi, settings: EngineSettings, clock: SharedClock) -> Self {
        let status = Arc::new(StatusSynchronizer::new(
            api.clone(),
            settings.status,
            clock.clone(),
        ));
        let leads = Arc::new(LeadPageCache::new(api.clone(), settings.leads, clock.clone()));
        let campaigns = Arc::new(CampaignSelector::new(
            api.clone(),
            settings.campaigns,
            clock,
        ));
        let dispatcher = Arc::new(CallDispatcher::new(api, status.clone()));

        Self {
            status,
            leads,
            campaigns,
            dispatcher,
            pager: Mutex::new(Pager::default()),
        }
    }

    fn lock_pager(&self) -> MutexGuard<'_, Pager> {
        self.pager.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn pager(&self) -> Pager {
        *self.lock_pager()
    }

    /// Start the status poll loop on its own task
    pub fn spawn_polling(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let status = self.status.clone();
        tokio::spawn(async move { status.run(shutdown).await })
    }

    async fn load(&self, page: u32) -> PageView {
        let view = self.leads.get_page(page).await;
        if view.error.is_none() && !view.showing_previous {
            self.lock_pager().set_total_pages(view.page.total_pages);
        }
        view
    }

    /// Show page `n`, clamped to the known page count
    pub async fn go_to_page(&self, n: u32) -> PageView {
        let target = self.lock_pager().go_to(n);
        if target != n {
            tracing::debug!(requested = n, target, "page request clamped");
        }
        self.load(target).await
    }

    pub async fn next_page(&self) -> PageView {
        let target = self.lock_pager().next();
        self.load(target).await
    }

    pub async fn prev_page(&self) -> PageView {
        let target = self.lock_pager().prev();
        self.load(target).await
    }

    /// Re-request the current page (served from cache while fresh)
    pub async fn reload_page(&self) -> PageView {
        let target = self.lock_pager().current();
        self.load(target).await
    }

    fn campaign(&self) -> String {
        self.campaigns.selected().unwrap_or_default()
    }

    /// Start the lead shown at `row` of the displayed page
    pub async fn start_row(&self, row: usize) -> Result<DispatchOutcome, DispatchError> {
        let Some(index) = self.leads.global_index(row) else {
            return Err(DispatchError::new(None, ValidationError::InvalidIndex.into()));
        };
        self.dispatcher.start_call_at(index, &self.campaign()).await
    }

    /// Start the lead at global `index` with the selected campaign
    pub async fn start_index(&self, index: u64) -> Result<DispatchOutcome, DispatchError> {
        self.dispatcher.start_call_at(index, &self.campaign()).await
    }

    /// Start the lead after the last one on the displayed page
    pub async fn call_next(&self) -> Result<DispatchOutcome, DispatchError> {
        let page = self.leads.current().unwrap_or_else(Page::empty);
        self.dispatcher.start_next(&page, &self.campaign()).await
    }

    /// Invalidate every cache and refetch what is on screen
    pub async fn refresh_all(&self) -> PageView {
        self.status.refresh();
        self.leads.refresh();
        self.campaigns.refresh();

        let (view, _) = futures::join!(self.reload_page(), self.campaigns.list_campaigns());
        view
    }

    /// Call after anything that changed the server-side lead list (upload, delete)
    pub async fn after_list_mutation(&self) -> PageView {
        tracing::info!("Lead list changed, reloading");
        self.leads.refresh();
        self.reload_page().await
    }
}
