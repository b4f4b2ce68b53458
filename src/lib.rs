//! dialdeck - call/status sync engine for an outbound-calling dialer
//!
//! The engine keeps a polled view of the dialer's call state, caches the
//! paginated lead list, and dispatches call starts without duplicating them.
//!
//! Architecture:
//! - Transport: `DialerApi` trait over the dialer's JSON API (reqwest)
//! - Status: 1 s poll loop with a failure budget that pauses polling
//! - Leads / campaigns: keyed query caches with freshness windows
//! - Dispatcher: start/end/stop with a single in-flight marker
//! - Engine: `Dashboard` wires the above together for the UI and CLI

pub mod campaigns;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod leads;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod query;
pub mod status;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use engine::{Dashboard, EngineSettings};
pub use error::{ApiError, DispatchError, ValidationError};
pub use model::{CallStatus, Campaign, Lead, Page};
