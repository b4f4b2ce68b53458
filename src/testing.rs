//! Scripted dialer API for unit tests
//!
//! Each endpoint pops scripted results first and falls back to a sensible
//! default once its script runs out. Every call is recorded so tests can
//! assert on exactly which requests went over the "network".

use crate::error::ApiError;
use crate::model::{sample_lead, CallStatus, Campaign, Page, SessionAck, StartAck};
use crate::transport::DialerApi;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Page size used by the default lead list
pub const PAGE_SIZE: u64 = 10;
/// Total leads in the default lead list
pub const TOTAL_LEADS: u64 = 47;

/// A recorded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Status,
    Leads(u32),
    StartCall(u64, String),
    Campaigns,
    EndCall(bool),
    StopAll,
    AutoNext(bool),
    SelectCampaign(Option<String>),
}

#[derive(Default)]
struct Script {
    status: VecDeque<Result<CallStatus, ApiError>>,
    leads: HashMap<u32, VecDeque<Result<Page, ApiError>>>,
    start: VecDeque<Result<StartAck, ApiError>>,
    campaigns: VecDeque<Result<Vec<Campaign>, ApiError>>,
    session: VecDeque<Result<SessionAck, ApiError>>,
    status_fallback: Option<Result<CallStatus, ApiError>>,
}

/// Requests held at a gate until the test releases them
#[derive(Default)]
struct Gates {
    start: Option<Arc<Semaphore>>,
    leads: HashMap<u32, Arc<Semaphore>>,
    status: Option<Arc<Semaphore>>,
}

#[derive(Default)]
pub struct FakeApi {
    script: Mutex<Script>,
    gates: Mutex<Gates>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_status(&self, result: Result<CallStatus, ApiError>) {
        self.script.lock().unwrap().status.push_back(result);
    }

    /// Result returned by every status poll once the script is empty
    pub fn set_status_fallback(&self, result: Result<CallStatus, ApiError>) {
        self.script.lock().unwrap().status_fallback = Some(result);
    }

    pub fn push_page(&self, page: u32, result: Result<Page, ApiError>) {
        self.script
            .lock()
            .unwrap()
            .leads
            .entry(page)
            .or_default()
            .push_back(result);
    }

    pub fn push_start(&self, result: Result<StartAck, ApiError>) {
        self.script.lock().unwrap().start.push_back(result);
    }

    pub fn push_campaigns(&self, result: Result<Vec<Campaign>, ApiError>) {
        self.script.lock().unwrap().campaigns.push_back(result);
    }

    pub fn push_session(&self, result: Result<SessionAck, ApiError>) {
        self.script.lock().unwrap().session.push_back(result);
    }

    /// Hold every start request until [`release_starts`](Self::release_starts)
    pub fn hold_starts(&self) {
        self.gates.lock().unwrap().start = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_starts(&self, n: usize) {
        if let Some(gate) = &self.gates.lock().unwrap().start {
            gate.add_permits(n);
        }
    }

    /// Hold the next request for `page`; later requests for it pass straight through
    pub fn hold_next_page(&self, page: u32) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().leads.insert(page, gate.clone());
        gate
    }

    /// Hold the next status request; later polls pass straight through
    pub fn hold_next_status(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().status = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn status_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Status))
    }

    pub fn leads_calls(&self, page: u32) -> usize {
        self.count(|c| *c == Call::Leads(page))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

async fn pass(gate: Option<Arc<Semaphore>>) {
    if let Some(gate) = gate {
        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
    }
}

/// Page `n` of a 47-lead list with 10 leads per page
pub fn default_page(page: u32) -> Page {
    let total_pages = TOTAL_LEADS.div_ceil(PAGE_SIZE) as u32;
    let page = page.clamp(1, total_pages);
    let start = (page as u64 - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(TOTAL_LEADS);
    Page {
        leads: (start..end).map(sample_lead).collect(),
        page,
        total_pages,
        start_index: start,
        total_leads: TOTAL_LEADS,
    }
}

pub fn default_campaigns() -> Vec<Campaign> {
    vec![
        Campaign {
            key: "solar".to_string(),
            label: "Solar Savings".to_string(),
        },
        Campaign {
            key: "insurance".to_string(),
            label: "Insurance Review".to_string(),
        },
    ]
}

/// A running status for `index`
pub fn running_status(index: u64) -> CallStatus {
    CallStatus {
        status: "running".to_string(),
        running: true,
        lead_index: Some(index),
        campaign: Some("solar".to_string()),
        campaign_label: Some("Solar Savings".to_string()),
        auto_next: false,
        lead: Some(sample_lead(index)),
    }
}

#[async_trait::async_trait]
impl DialerApi for FakeApi {
    async fn status(&self) -> Result<CallStatus, ApiError> {
        self.record(Call::Status);
        let gate = self.gates.lock().unwrap().status.take();
        let result = {
            let mut script = self.script.lock().unwrap();
            match script.status.pop_front() {
                Some(result) => result,
                None => script
                    .status_fallback
                    .clone()
                    .unwrap_or_else(|| Ok(CallStatus::default())),
            }
        };
        pass(gate).await;
        result
    }

    async fn leads(&self, page: u32) -> Result<Page, ApiError> {
        self.record(Call::Leads(page));
        let gate = self.gates.lock().unwrap().leads.remove(&page);
        let result = self
            .script
            .lock()
            .unwrap()
            .leads
            .get_mut(&page)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| Ok(default_page(page)));
        pass(gate).await;
        result
    }

    async fn start_call(&self, index: u64, campaign: &str) -> Result<StartAck, ApiError> {
        self.record(Call::StartCall(index, campaign.to_string()));
        let gate = self.gates.lock().unwrap().start.clone();
        pass(gate).await;
        self.script
            .lock()
            .unwrap()
            .start
            .pop_front()
            .unwrap_or_else(|| {
                Ok(StartAck {
                    status: Some("running".to_string()),
                    lead_index: Some(index),
                    campaign: Some(campaign.to_string()),
                    campaign_label: None,
                })
            })
    }

    async fn campaigns(&self) -> Result<Vec<Campaign>, ApiError> {
        self.record(Call::Campaigns);
        self.script
            .lock()
            .unwrap()
            .campaigns
            .pop_front()
            .unwrap_or_else(|| Ok(default_campaigns()))
    }

    async fn end_call(&self, auto_next: bool) -> Result<SessionAck, ApiError> {
        self.record(Call::EndCall(auto_next));
        self.next_session()
    }

    async fn stop_all(&self) -> Result<SessionAck, ApiError> {
        self.record(Call::StopAll);
        self.next_session()
    }

    async fn set_auto_next(&self, enabled: bool) -> Result<SessionAck, ApiError> {
        self.record(Call::AutoNext(enabled));
        self.next_session()
    }

    async fn select_campaign(&self, campaign: Option<&str>) -> Result<SessionAck, ApiError> {
        self.record(Call::SelectCampaign(campaign.map(str::to_string)));
        self.next_session()
    }
}

impl FakeApi {
    fn next_session(&self) -> Result<SessionAck, ApiError> {
        self.script
            .lock()
            .unwrap()
            .session
            .pop_front()
            .unwrap_or_else(|| Ok(SessionAck::default()))
    }
}
