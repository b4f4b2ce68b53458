//! Domain types for leads, pages, call status and campaigns
//!
//! Wire structs mirror the JSON the dialer returns; `from_wire` constructors
//! validate them into the domain types the caches hold. Nothing downstream of
//! this module ever sees an unvalidated response.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// A prospect row from the uploaded lead list
///
/// Identity is positional: a lead is addressed by its global index in the
/// server-held list, never by a stored id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub prospect_name: String,
    pub company_name: String,
    pub job_title: String,
    pub phone: String,
    pub email: String,
    pub timezone: String,
}

/// One page of the lead list plus pagination metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub leads: Vec<Lead>,
    /// 1-indexed, never above `total_pages`
    pub page: u32,
    pub total_pages: u32,
    /// Global index of `leads[0]`, as reported by the server
    pub start_index: u64,
    pub total_leads: u64,
}

impl Page {
    /// Placeholder shown before anything has been fetched
    pub fn empty() -> Self {
        Self {
            leads: Vec::new(),
            page: 1,
            total_pages: 1,
            start_index: 0,
            total_leads: 0,
        }
    }

    /// Global index of the row at `row` on this page
    pub fn global_index(&self, row: usize) -> Option<u64> {
        (row < self.leads.len()).then(|| self.start_index + row as u64)
    }

    /// Index immediately after the last displayed lead
    ///
    /// This is what "call next" dials. It is not reconciled with the server's
    /// real progress: a stale page can point at an already-called lead.
    pub fn next_index(&self) -> u64 {
        self.start_index + self.leads.len() as u64
    }

    pub(crate) fn from_wire(wire: WirePage) -> Result<Self, ValidationError> {
        if wire.page < 1 {
            return Err(ValidationError::Malformed("page must be >= 1".into()));
        }
        if wire.total_pages < 1 {
            return Err(ValidationError::Malformed("total_pages must be >= 1".into()));
        }
        if wire.page > wire.total_pages {
            return Err(ValidationError::Malformed(format!(
                "page {} exceeds total_pages {}",
                wire.page, wire.total_pages
            )));
        }
        if wire.start_index.saturating_add(wire.leads.len() as u64) > wire.total_leads {
            return Err(ValidationError::Malformed(format!(
                "start_index {} + {} leads exceeds total_leads {}",
                wire.start_index,
                wire.leads.len(),
                wire.total_leads
            )));
        }

        Ok(Self {
            leads: wire.leads,
            page: wire.page,
            total_pages: wire.total_pages,
            start_index: wire.start_index,
            total_leads: wire.total_leads,
        })
    }
}

/// Server-side call state as last observed by polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallStatus {
    /// idle | running | stopping
    pub status: String,
    pub running: bool,
    pub lead_index: Option<u64>,
    pub campaign: Option<String>,
    pub campaign_label: Option<String>,
    pub auto_next: bool,
    pub lead: Option<Lead>,
}

impl Default for CallStatus {
    fn default() -> Self {
        Self {
            status: "idle".to_string(),
            running: false,
            lead_index: None,
            campaign: None,
            campaign_label: None,
            auto_next: false,
            lead: None,
        }
    }
}

impl CallStatus {
    pub(crate) fn from_wire(wire: WireStatus) -> Result<Self, ValidationError> {
        // The dialer sends `{}` rather than null when there is no lead
        let lead = match wire.lead {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Object(map)) if map.is_empty() => None,
            Some(value) => Some(
                serde_json::from_value::<Lead>(value)
                    .map_err(|e| ValidationError::Malformed(format!("status.lead: {}", e)))?,
            ),
        };

        if wire.running {
            if wire.lead_index.is_none() {
                return Err(ValidationError::Malformed(
                    "running status without lead_index".into(),
                ));
            }
            if lead.is_none() {
                return Err(ValidationError::Malformed("running status without lead".into()));
            }
        }

        // A finished call leaves its index behind on the server; idle means no lead
        let (lead_index, lead) = if wire.running {
            (wire.lead_index, lead)
        } else {
            (None, None)
        };

        Ok(Self {
            status: wire.status,
            running: wire.running,
            lead_index,
            campaign: wire.campaign,
            campaign_label: wire.campaign_label,
            auto_next: wire.auto_next,
            lead,
        })
    }
}

/// A selectable campaign script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub key: String,
    pub label: String,
}

/// Server acknowledgment of a call start
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct StartAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub lead_index: Option<u64>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub campaign_label: Option<String>,
}

/// Server acknowledgment of end/stop/auto-next/select requests
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SessionAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub auto_next: Option<bool>,
    #[serde(default)]
    pub auto_next_started: Option<bool>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub campaign_label: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire formats
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct WireStatus {
    pub status: String,
    pub running: bool,
    #[serde(default)]
    pub lead_index: Option<u64>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub campaign_label: Option<String>,
    #[serde(default)]
    pub auto_next: bool,
    #[serde(default)]
    pub lead: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePage {
    pub leads: Vec<Lead>,
    pub total_pages: u32,
    pub start_index: u64,
    pub total_leads: u64,
    pub page: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCampaigns {
    pub campaigns: Vec<Campaign>,
}

/// Body of a non-2xx response: `{ "ok": false, "error": "...", "code": "..." }`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StartCallRequest<'a> {
    pub index: u64,
    pub campaign: &'a str,
}

#[cfg(test)]
pub(crate) fn sample_lead(n: u64) -> Lead {
    Lead {
        prospect_name: format!("Prospect {}", n),
        company_name: format!("Company {}", n),
        job_title: "Head of Ops".to_string(),
        phone: format!("+1555000{:04}", n),
        email: format!("p{}@example.com", n),
        timezone: "America/New_York".to_string(),
    }
}
