//! Call dispatcher - start calls and session controls
//!
//! Resolves a lead by its global index (independent of the page on screen)
//! into a start request for the chosen campaign.
//!
//! # In-flight marker
//!
//! Before a start is sent its index is recorded as the single in-flight
//! marker. While it is held no other start goes out: a second start for the
//! same index is a no-op, a start for any other index is refused as busy.
//! The marker is only cleared when its own request settles, whichever way it
//! exits (including the future being dropped), by an RAII guard.
//!
//! Starts are never retried automatically: dialing twice is worse than
//! asking the operator to press the key again.
//!
//! After the server acknowledges, the dispatcher asks the status
//! synchronizer for an immediate poll and broadcasts a [`DispatchEvent`].

use crate::error::{ApiError, DispatchError};
use crate::model::{Page, SessionAck, StartAck};
use crate::status::StatusSynchronizer;
use crate::transport::SharedApi;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Result of a start request that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Started(StartAck),
    /// A start for the same index is still pending; nothing was sent
    AlreadyInFlight,
    /// A start for another index is still pending; nothing was sent
    Busy { pending: u64 },
}

/// Session-level controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    EndCall { auto_next: bool },
    StopAll,
    AutoNext(bool),
}

impl SessionAction {
    pub fn describe(&self) -> &'static str {
        match self {
            SessionAction::EndCall { auto_next: true } => "Call ended, moving to next lead",
            SessionAction::EndCall { auto_next: false } => "Call ended",
            SessionAction::StopAll => "All calls stopped",
            SessionAction::AutoNext(true) => "Auto-next enabled",
            SessionAction::AutoNext(false) => "Auto-next disabled",
        }
    }
}

/// Published after every acknowledged or rejected dispatch
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    Started {
        index: u64,
        campaign: String,
        ack: StartAck,
    },
    Rejected(DispatchError),
    SessionChanged {
        action: SessionAction,
        ack: SessionAck,
    },
}

/// Clears the in-flight marker on drop
struct InFlightGuard<'a> {
    slot: &'a Mutex<Option<u64>>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

pub struct CallDispatcher {
    api: SharedApi,
    status: Arc<StatusSynchronizer>,
    in_flight: Mutex<Option<u64>>,
    events: broadcast::Sender<DispatchEvent>,
}

impl CallDispatcher {
    pub fn new(api: SharedApi, status: Arc<StatusSynchronizer>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            status,
            in_flight: Mutex::new(None),
            events,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<u64>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    /// Index whose start is awaiting acknowledgment
    pub fn in_flight(&self) -> Option<u64> {
        *self.slot()
    }

    pub fn is_starting(&self, index: u64) -> bool {
        self.in_flight() == Some(index)
    }

    fn publish(&self, event: DispatchEvent) {
        // No subscribers is fine (one-shot CLI commands); a lagging
        // receiver drops the oldest events and catches up on its own
        let _ = self.events.send(event);
    }

    /// Start a call for the lead at global `index`
    pub async fn start_call_at(
        &self,
        index: u64,
        campaign: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        let guard = {
            let mut slot = self.slot();
            match *slot {
                Some(pending) if pending == index => {
                    tracing::debug!(index, "start already in flight, ignoring");
                    return Ok(DispatchOutcome::AlreadyInFlight);
                }
                Some(pending) => {
                    tracing::debug!(pending, index, "another start in flight, refusing");
                    return Ok(DispatchOutcome::Busy { pending });
                }
                None => {}
            }
            *slot = Some(index);
            InFlightGuard {
                slot: &self.in_flight,
            }
        };

        tracing::debug!(index, campaign, "sending start request");
        let result = self.api.start_call(index, campaign).await;
        drop(guard);

        match result {
            Ok(ack) => {
                tracing::info!(
                    lead = index + 1,
                    campaign = ack.campaign_label.as_deref().unwrap_or(campaign),
                    "Call start acknowledged"
                );
                self.status.refresh();
                self.publish(DispatchEvent::Started {
                    index,
                    campaign: campaign.to_string(),
                    ack: ack.clone(),
                });
                Ok(DispatchOutcome::Started(ack))
            }
            Err(e) => {
                let err = DispatchError::new(Some(index), e);
                tracing::warn!(lead = index + 1, error = %err.source, "Call start rejected");
                self.publish(DispatchEvent::Rejected(err.clone()));
                Err(err)
            }
        }
    }

    /// Start the lead right after the last one shown on `page`
    ///
    /// Uses `start_index + leads.len()` of the page as given. A stale page can
    /// therefore target a lead that was already called.
    pub async fn start_next(
        &self,
        page: &Page,
        campaign: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.start_call_at(page.next_index(), campaign).await
    }

    pub async fn end_call(&self, auto_next: bool) -> Result<SessionAck, DispatchError> {
        let result = self.api.end_call(auto_next).await;
        self.settle_session(SessionAction::EndCall { auto_next }, result)
    }

    pub async fn stop_all(&self) -> Result<SessionAck, DispatchError> {
        let result = self.api.stop_all().await;
        self.settle_session(SessionAction::StopAll, result)
    }

    pub async fn set_auto_next(&self, enabled: bool) -> Result<SessionAck, DispatchError> {
        let result = self.api.set_auto_next(enabled).await;
        self.settle_session(SessionAction::AutoNext(enabled), result)
    }

    fn settle_session(
        &self,
        action: SessionAction,
        result: Result<SessionAck, ApiError>,
    ) -> Result<SessionAck, DispatchError> {
        match result {
            Ok(ack) => {
                tracing::info!(?action, status = ack.status.as_deref(), "{}", action.describe());
                self.status.refresh();
                self.publish(DispatchEvent::SessionChanged {
                    action,
                    ack: ack.clone(),
                });
                Ok(ack)
            }
            Err(e) => {
                let err = DispatchError::new(None, e);
                tracing::warn!(?action, error = %err.source, "Session request failed");
                self.publish(DispatchEvent::Rejected(err.clone()));
                Err(err)
            }
        }
    }
}
