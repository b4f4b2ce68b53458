//! Status synchronizer - keeps the remote call state in sync by polling
//!
//! Polls the dialer at a fixed interval (1 s by default). Each tick always
//! refetches; there is no caching window. Failures are counted and after
//! `max_failures` consecutive failures polling pauses until `refresh()` is
//! called. Consumers always get a renderable status: the last good one, or
//! the idle default before the first success.
//!
//! ```text
//!            ┌──────── tick / refresh ────────┐
//!            ▼                                │
//!   paused? ──yes──→ skip                     │
//!      │no                                    │
//!      ▼                                      │
//!   GET status ──ok──→ store, failures = 0 ───┤
//!      │err                                   │
//!      ▼                                      │
//!   failures += 1 ── == max? ──→ pause ───────┘
//! ```

use crate::clock::SharedClock;
use crate::error::ApiError;
use crate::model::CallStatus;
use crate::transport::SharedApi;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;

/// Polling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    pub poll_interval: Duration,
    /// Consecutive failures before polling pauses
    pub max_failures: u32,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            max_failures: 3,
        }
    }
}

/// What a single poll step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    Updated,
    Failed { consecutive: u32, paused: bool },
    /// Polling is paused; no request was made
    Paused,
    /// A newer poll was issued while this one was in flight
    Superseded,
}

/// Renderable snapshot of the synchronizer
#[derive(Debug, Clone)]
pub struct StatusView {
    /// Last good status, or the idle default
    pub status: CallStatus,
    /// At least one poll has succeeded
    pub has_data: bool,
    /// Error from the most recent failed poll, cleared on success
    pub error: Option<ApiError>,
    pub paused: bool,
    pub consecutive_failures: u32,
    pub last_success: Option<Instant>,
}

struct SyncState {
    status: Option<CallStatus>,
    error: Option<ApiError>,
    consecutive_failures: u32,
    paused: bool,
    last_success: Option<Instant>,
    issued: u64,
}

/// Polls call status and exposes the latest known state
pub struct StatusSynchronizer {
    api: SharedApi,
    policy: StatusPolicy,
    clock: SharedClock,
    state: Mutex<SyncState>,
    wake: Notify,
}

impl StatusSynchronizer {
    pub fn new(api: SharedApi, policy: StatusPolicy, clock: SharedClock) -> Self {
        Self {
            api,
            policy,
            clock,
            state: Mutex::new(SyncState {
                status: None,
                error: None,
                consecutive_failures: 0,
                paused: false,
                last_success: None,
                issued: 0,
            }),
            wake: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Latest known status; the idle default until the first successful poll
    pub fn get_status(&self) -> CallStatus {
        self.lock().status.clone().unwrap_or_default()
    }

    pub fn snapshot(&self) -> StatusView {
        let state = self.lock();
        StatusView {
            status: state.status.clone().unwrap_or_default(),
            has_data: state.status.is_some(),
            error: state.error.clone(),
            paused: state.paused,
            consecutive_failures: state.consecutive_failures,
            last_success: state.last_success,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// Reset the failure budget, resume polling and request an immediate fetch
    pub fn refresh(&self) {
        {
            let mut state = self.lock();
            if state.paused {
                tracing::info!("Status polling resumed");
            }
            state.consecutive_failures = 0;
            state.paused = false;
        }
        self.wake.notify_one();
    }

    /// [`refresh`](Self::refresh) and wait for the resulting poll
    ///
    /// For callers without a running poll loop (one-shot CLI commands).
    pub async fn refresh_now(&self) -> PollResult {
        self.refresh();
        self.poll_once().await
    }

    /// Run one poll step
    pub async fn poll_once(&self) -> PollResult {
        let ticket = {
            let mut state = self.lock();
            if state.paused {
                return PollResult::Paused;
            }
            state.issued += 1;
            state.issued
        };

        let result = self.api.status().await;

        let mut state = self.lock();
        if state.issued != ticket {
            tracing::debug!(ticket, latest = state.issued, "dropping superseded status poll");
            return PollResult::Superseded;
        }

        match result {
            Ok(status) => {
                log_transition(state.status.as_ref(), &status);
                state.status = Some(status);
                state.error = None;
                state.consecutive_failures = 0;
                state.last_success = Some(self.clock.now());
                PollResult::Updated
            }
            Err(e) => {
                state.consecutive_failures += 1;
                let consecutive = state.consecutive_failures;
                if consecutive >= self.policy.max_failures {
                    state.paused = true;
                    tracing::warn!(
                        failures = consecutive,
                        error = %e,
                        "Status polling paused after repeated failures (refresh to resume)"
                    );
                } else {
                    tracing::debug!(failures = consecutive, error = %e, "Status poll failed");
                }
                state.error = Some(e);
                PollResult::Failed {
                    consecutive,
                    paused: state.paused,
                }
            }
        }
    }

    /// Poll until `shutdown` flips to true (or its sender is dropped)
    ///
    /// Keeps running through individual failures; a paused synchronizer
    /// idles on the ticker until `refresh()` wakes it.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.policy.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(interval_ms = self.policy.poll_interval.as_millis() as u64, "Status polling started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.wake.notified() => {
                    ticker.reset();
                }
                _ = shutdown.changed() => break,
            }

            if *shutdown.borrow() {
                break;
            }

            self.poll_once().await;
        }

        tracing::debug!("Status polling stopped");
    }
}

fn log_transition(previous: Option<&CallStatus>, next: &CallStatus) {
    let was_running = previous.map(|s| s.running).unwrap_or(false);
    let previous_lead = previous.and_then(|s| s.lead_index);

    match (was_running, next.running) {
        (false, true) => tracing::info!(
            lead_index = next.lead_index,
            campaign = next.campaign_label.as_deref().or(next.campaign.as_deref()),
            "Call started"
        ),
        (true, false) => tracing::info!(lead_index = previous_lead, "Call ended"),
        (true, true) if previous_lead != next.lead_index => tracing::info!(
            from = previous_lead,
            to = next.lead_index,
            "Moved to next lead"
        ),
        _ => {}
    }

    if let Some(prev) = previous {
        if prev.auto_next != next.auto_next {
            tracing::info!(enabled = next.auto_next, "Auto-next changed");
        }
    }
}
