//! Campaign selector
//!
//! Selection is plain local state: choosing a campaign makes no request and
//! is not validated against the loaded list (the dialer validates on start).
//! The campaign list itself is cached independently of leads and status,
//! 5 minutes fresh with 2 retries by default.

use crate::clock::SharedClock;
use crate::error::ApiError;
use crate::model::{Campaign, SessionAck};
use crate::query::{QueryCache, QueryPolicy};
use crate::transport::SharedApi;
use std::sync::{Mutex, MutexGuard};

/// Campaign list plus the error from the last fetch, if it failed
#[derive(Debug, Clone, Default)]
pub struct CampaignList {
    pub campaigns: Vec<Campaign>,
    pub error: Option<ApiError>,
}

pub struct CampaignSelector {
    api: SharedApi,
    cache: QueryCache<(), Vec<Campaign>>,
    selected: Mutex<Option<String>>,
}

impl CampaignSelector {
    pub fn new(api: SharedApi, policy: QueryPolicy, clock: SharedClock) -> Self {
        Self {
            api,
            cache: QueryCache::new(policy, clock),
            selected: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.selected.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn selected(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Select `key` locally; an empty key clears the selection
    pub fn select(&self, key: impl Into<String>) {
        let key = key.into();
        let mut selected = self.lock();
        *selected = (!key.is_empty()).then_some(key);
        tracing::debug!(campaign = ?selected.as_deref(), "campaign selected");
    }

    /// Campaigns from the cache, refetching once the entry is stale
    pub async fn list_campaigns(&self) -> CampaignList {
        let outcome = self
            .cache
            .fetch((), || {
                let api = self.api.clone();
                async move { api.campaigns().await }
            })
            .await;

        if let Some(e) = &outcome.error {
            tracing::warn!(error = %e, "Failed to load campaigns");
        }

        CampaignList {
            campaigns: outcome.value.unwrap_or_default(),
            error: outcome.error,
        }
    }

    /// Last loaded campaign list without touching the network
    pub fn cached(&self) -> Vec<Campaign> {
        self.cache.latest(&()).unwrap_or_default()
    }

    pub fn refresh(&self) {
        self.cache.invalidate_all();
    }

    /// Display label for the selection, falling back to the raw key
    pub fn selected_label(&self) -> Option<String> {
        let key = self.selected()?;
        let label = self
            .cached()
            .into_iter()
            .find(|c| c.key == key)
            .map(|c| c.label);
        Some(label.unwrap_or(key))
    }

    /// Move the selection to the next loaded campaign, wrapping around
    ///
    /// With nothing (or an unknown key) selected, picks the first campaign.
    pub fn cycle(&self) -> Option<String> {
        let campaigns = self.cached();
        if campaigns.is_empty() {
            return self.selected();
        }

        let current = self.selected();
        let next = current
            .as_deref()
            .and_then(|key| campaigns.iter().position(|c| c.key == key))
            .map(|i| (i + 1) % campaigns.len())
            .unwrap_or(0);

        let key = campaigns[next].key.clone();
        self.select(key.clone());
        Some(key)
    }

    /// Tell the dialer which campaign auto-next should use
    pub async fn publish(&self) -> Result<SessionAck, ApiError> {
        let selected = self.selected();
        let ack = self.api.select_campaign(selected.as_deref()).await?;
        tracing::info!(
            campaign = ack.campaign_label.as_deref().or(selected.as_deref()),
            "Campaign sent to dialer"
        );
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::{default_campaigns, Call, FakeApi};
    use std::sync::Arc;
    use std::time::Duration;

    fn selector_with(api: Arc<FakeApi>) -> (CampaignSelector, ManualClock) {
        let clock = ManualClock::new();
        let policy = QueryPolicy {
            stale_time: Duration::from_secs(300),
            retries: 2,
            retry_delay: Duration::ZERO,
        };
        (CampaignSelector::new(api, policy, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn select_is_local_only() {
        let api = FakeApi::new();
        let (selector, _clock) = selector_with(api.clone());

        assert_eq!(selector.selected(), None);
        selector.select("not-loaded-yet");
        assert_eq!(selector.selected().as_deref(), Some("not-loaded-yet"));
        assert!(api.calls().is_empty());

        selector.select("");
        assert_eq!(selector.selected(), None);
    }

    #[tokio::test]
    async fn list_is_cached_for_five_minutes() {
        let api = FakeApi::new();
        let (selector, clock) = selector_with(api.clone());

        assert_eq!(selector.list_campaigns().await.campaigns, default_campaigns());
        clock.advance(Duration::from_secs(299));
        selector.list_campaigns().await;
        assert_eq!(api.count(|c| *c == Call::Campaigns), 1);

        clock.advance(Duration::from_secs(2));
        selector.list_campaigns().await;
        assert_eq!(api.count(|c| *c == Call::Campaigns), 2);
    }

    #[tokio::test]
    async fn failed_list_keeps_previous_campaigns() {
        let api = FakeApi::new();
        let (selector, _clock) = selector_with(api.clone());
        selector.list_campaigns().await;

        selector.refresh();
        for _ in 0..3 {
            api.push_campaigns(Err(ApiError::Network("down".into())));
        }
        let list = selector.list_campaigns().await;
        assert!(list.error.is_some());
        assert_eq!(list.campaigns.len(), 2);
        assert_eq!(api.count(|c| *c == Call::Campaigns), 4);
    }

    #[tokio::test]
    async fn cycle_and_label() {
        let (selector, _clock) = selector_with(FakeApi::new());
        assert_eq!(selector.cycle(), None);

        selector.list_campaigns().await;
        assert_eq!(selector.cycle().as_deref(), Some("solar"));
        assert_eq!(selector.selected_label().as_deref(), Some("Solar Savings"));
        assert_eq!(selector.cycle().as_deref(), Some("insurance"));
        assert_eq!(selector.cycle().as_deref(), Some("solar"));

        selector.select("retired");
        assert_eq!(selector.selected_label().as_deref(), Some("retired"));
    }

    #[tokio::test]
    async fn publish_sends_selection() {
        let api = FakeApi::new();
        let (selector, _clock) = selector_with(api.clone());
        selector.select("insurance");

        selector.publish().await.unwrap();
        assert_eq!(
            api.calls(),
            vec![Call::SelectCampaign(Some("insurance".to_string()))]
        );
    }
}
