//! Error taxonomy for the dialer API boundary
//!
//! Three families matter to callers:
//! - **Network**: transport failures and server-side 5xx. Caches retry these.
//! - **Validation**: the server rejected the request shape, or a response did
//!   not match the expected schema. Never retried automatically.
//! - **Conflict**: a call is already running. Never retried, rendered distinctly.

use std::fmt;

/// Reasons a request or response failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The lead index does not exist in the server-held list
    InvalidIndex,
    /// No campaign was selected or the campaign key is unknown
    NoActiveCampaign,
    /// Any other 4xx rejection, with the server's message
    Rejected(String),
    /// Response body did not match the expected schema
    Malformed(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIndex => write!(f, "invalid lead index"),
            Self::NoActiveCampaign => write!(f, "no active campaign"),
            Self::Rejected(msg) => write!(f, "request rejected: {}", msg),
            Self::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

/// Errors returned by every [`DialerApi`](crate::transport::DialerApi) call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Connection, read or server failure
    Network(String),
    /// The transport gave up waiting for a response
    Timeout,
    /// Server rejected the request or returned an unexpected shape
    Validation(ValidationError),
    /// A call is already running on the server
    Conflict(String),
}

impl ApiError {
    /// Whether a cache may retry this error within its retry budget
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Validation(ValidationError::Malformed(msg.into()))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {}", msg),
            Self::Timeout => write!(f, "request timed out"),
            Self::Validation(e) => write!(f, "{}", e),
            Self::Conflict(msg) => write!(f, "conflict: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

/// A failed call-start (or session control) request
///
/// Carries the global index the request was issued for, when there was one,
/// so the UI can point at the right row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    pub index: Option<u64>,
    pub source: ApiError,
}

impl DispatchError {
    pub fn new(index: Option<u64>, source: ApiError) -> Self {
        Self { index, source }
    }

    /// True when the server refused because a call is already in progress
    pub fn is_conflict(&self) -> bool {
        matches!(self.source, ApiError::Conflict(_))
    }

    /// Short message for toasts and CLI output, one per failure kind
    pub fn user_message(&self) -> String {
        match &self.source {
            ApiError::Conflict(_) => {
                "A call is already running - end it before starting another".to_string()
            }
            ApiError::Validation(ValidationError::InvalidIndex) => match self.index {
                Some(i) => format!("Lead #{} does not exist", i + 1),
                None => "That lead does not exist".to_string(),
            },
            ApiError::Validation(ValidationError::NoActiveCampaign) => {
                "Select a campaign before starting a call".to_string()
            }
            ApiError::Validation(ValidationError::Rejected(msg)) => {
                format!("Server rejected the request: {}", msg)
            }
            ApiError::Validation(ValidationError::Malformed(_)) => {
                "Unexpected response from the dialer".to_string()
            }
            ApiError::Timeout => "The dialer did not answer in time".to_string(),
            ApiError::Network(_) => "Failed to reach the dialer".to_string(),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "dispatch for lead {} failed: {}", i, self.source),
            None => write!(f, "dispatch failed: {}", self.source),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
