//! HTTP API handler for the email preference center.
//!
//! Framework-agnostic: accepts `ApiRequest`, returns `ApiResponse`.
//! The Lambda entry point in `src/bin/api.rs` adapts `lambda_http` types to/from
//! these and calls `handle`.

mod handlers;

use crate::providers::{CampaignProvider, PreferencesProvider, Providers};
use std::fmt;
use std::str::FromStr;

/// Sent on every response, including errors and preflight.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "Content-Type"),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
];

// ============================================================================
// Request / Response types
// ============================================================================

pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub body: Option<String>,
}

#[derive(Debug)]
pub enum ApiResponse {
    Json { status: u16, body: String },
    /// Preflight answer: 204, empty body.
    NoContent,
}

impl ApiResponse {
    pub(crate) fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::Json {
            status,
            body: body.to_string(),
        }
    }

    pub(crate) fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Json { status, .. } => *status,
            Self::NoContent => 204,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Json { body, .. } => body,
            Self::NoContent => "",
        }
    }

    pub fn headers(&self) -> Vec<(&'static str, &'static str)> {
        let mut headers = CORS_HEADERS.to_vec();
        if let Self::Json { .. } = self {
            headers.push(("Content-Type", "application/json"));
        }
        headers
    }
}

// ============================================================================
// Actions
// ============================================================================

/// The three things a recipient can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Subscribe,
    UnsubscribeCampaign,
    UnsubscribeAll,
}

impl Action {
    /// Resolve the endpoint from the last path segment, so `/api/subscribe`
    /// and `/.netlify/functions/subscribe` both reach `Subscribe`.
    pub fn from_path(path: &str) -> Option<Self> {
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse().ok())
    }

    /// Top-level error for a request that failed after validation.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Subscribe => "Failed to process subscription",
            Self::UnsubscribeCampaign | Self::UnsubscribeAll => "Failed to process unsubscription",
        }
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscribe" => Ok(Self::Subscribe),
            "unsubscribe-campaign" => Ok(Self::UnsubscribeCampaign),
            "unsubscribe-all" => Ok(Self::UnsubscribeAll),
            other => anyhow::bail!(
                "Unknown action: {}. Valid actions are: subscribe, unsubscribe-campaign, unsubscribe-all",
                other
            ),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscribe => write!(f, "subscribe"),
            Self::UnsubscribeCampaign => write!(f, "unsubscribe-campaign"),
            Self::UnsubscribeAll => write!(f, "unsubscribe-all"),
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

pub async fn handle<H, R>(request: &ApiRequest, providers: &Providers<H, R>) -> ApiResponse
where
    H: PreferencesProvider,
    R: CampaignProvider,
{
    let Some(action) = Action::from_path(&request.path) else {
        return ApiResponse::error(404, "Not found");
    };
    let body = request.body.as_deref().unwrap_or("");

    match (request.method.as_str(), action) {
        ("OPTIONS", _) => ApiResponse::NoContent,
        ("POST", Action::Subscribe) => handlers::subscribe_post(providers, body).await,
        ("POST", Action::UnsubscribeCampaign) => {
            handlers::unsubscribe_campaign_post(providers, body).await
        }
        ("POST", Action::UnsubscribeAll) => handlers::unsubscribe_all_post(providers, body).await,
        _ => ApiResponse::error(405, "Method not allowed"),
    }
}
