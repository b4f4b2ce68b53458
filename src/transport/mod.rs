//! Dialer API boundary
//!
//! Every network call the engine makes goes through [`DialerApi`]. The HTTP
//! implementation lives in [`http`]; tests substitute a scripted fake.
//!
//! ```text
//! StatusSynchronizer ──┐
//! LeadPageCache ───────┼──→ DialerApi ──→ HttpDialerApi ──→ dialer server
//! CampaignSelector ────┤
//! CallDispatcher ──────┘
//! ```

pub mod http;

use crate::error::ApiError;
use crate::model::{CallStatus, Campaign, Page, SessionAck, StartAck};
use std::sync::Arc;

pub use http::HttpDialerApi;

/// Operations exposed by the dialer server
///
/// Implementations validate responses before returning them, so callers
/// only ever see well-formed domain types or an [`ApiError`].
#[async_trait::async_trait]
pub trait DialerApi: Send + Sync {
    /// Current call/session state
    async fn status(&self) -> Result<CallStatus, ApiError>;

    /// One page of leads (1-indexed)
    async fn leads(&self, page: u32) -> Result<Page, ApiError>;

    /// Start a call for the lead at `index` (global, zero-based)
    async fn start_call(&self, index: u64, campaign: &str) -> Result<StartAck, ApiError>;

    /// Available campaigns
    async fn campaigns(&self) -> Result<Vec<Campaign>, ApiError>;

    /// End the running call, optionally advancing to the next lead
    async fn end_call(&self, auto_next: bool) -> Result<SessionAck, ApiError>;

    /// Disable auto-next and end any running call
    async fn stop_all(&self) -> Result<SessionAck, ApiError>;

    /// Toggle server-side auto advance after a call ends
    async fn set_auto_next(&self, enabled: bool) -> Result<SessionAck, ApiError>;

    /// Remember the campaign server-side (used by auto-next)
    async fn select_campaign(&self, campaign: Option<&str>) -> Result<SessionAck, ApiError>;
}

/// Shared transport handle
pub type SharedApi = Arc<dyn DialerApi>;
