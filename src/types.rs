use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// Label the preference page shows when a link carries no campaign name.
pub const DEFAULT_CAMPAIGN_LABEL: &str = "Current Campaign";

// ============================================================================
// Source
// ============================================================================

/// Which platform sent the email the recipient clicked through from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    HubSpot,
    ReachInbox,
    #[default]
    Unknown,
}

impl Source {
    /// Unrecognized labels fall back to `Unknown` rather than rejecting the request.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "hubspot" => Self::HubSpot,
            "reachinbox" => Self::ReachInbox,
            _ => Self::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.map(|l| Self::from_label(&l)).unwrap_or_default())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HubSpot => write!(f, "hubspot"),
            Self::ReachInbox => write!(f, "reachinbox"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// PreferenceRequest
// ============================================================================

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("Email is required")]
    MissingEmail,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPreferenceRequest {
    email: Option<String>,
    campaign: Option<String>,
    #[serde(alias = "campaign_id")]
    campaign_id: Option<String>,
    #[serde(default)]
    source: Source,
}

/// A recipient's intent as posted by the preference page.
///
/// `email` is always non-empty. Blank optional fields are normalized to `None`;
/// the page sends empty strings for parameters missing from the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceRequest {
    pub email: String,
    pub campaign: Option<String>,
    pub campaign_id: Option<String>,
    pub source: Source,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PreferenceRequest {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            campaign: None,
            campaign_id: None,
            source: Source::Unknown,
        }
    }

    pub fn with_campaign(mut self, campaign: impl Into<String>) -> Self {
        self.campaign = Some(campaign.into());
        self
    }

    pub fn with_campaign_id(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Parse a JSON request body. An empty body is treated as `{}`.
    pub fn parse(body: &str) -> Result<Self, RequestError> {
        let raw: RawPreferenceRequest = if body.trim().is_empty() {
            RawPreferenceRequest::default()
        } else {
            serde_json::from_str(body)?
        };

        let email = non_blank(raw.email).ok_or(RequestError::MissingEmail)?;

        Ok(Self {
            email,
            campaign: non_blank(raw.campaign),
            campaign_id: non_blank(raw.campaign_id),
            source: raw.source,
        })
    }

    /// Campaign name for display, falling back to the page's default label.
    pub fn campaign_label(&self) -> &str {
        self.campaign.as_deref().unwrap_or(DEFAULT_CAMPAIGN_LABEL)
    }

    /// Campaign name usable for matching against provider data. The page's
    /// placeholder label is not a real campaign name.
    pub fn campaign_name(&self) -> Option<&str> {
        self.campaign
            .as_deref()
            .filter(|c| !c.eq_ignore_ascii_case(DEFAULT_CAMPAIGN_LABEL))
    }
}

// ============================================================================
// Provider data
// ============================================================================

/// A communications channel a contact can opt in to or out of on HubSpot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubscriptionDefinition {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

/// A lead enrolled in a ReachInbox campaign.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Lead {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
}

pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    HubSpot,
    ReachInbox,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HubSpot => write!(f, "HubSpot"),
            Self::ReachInbox => write!(f, "ReachInbox"),
        }
    }
}

/// Result of one provider's part of an action.
///
/// Soft failures (not configured, nothing to act on) are `success: false`
/// with a `message`; hard failures captured from a concurrent call carry
/// `error` instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutcome {
    pub provider: Provider,
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub resubscribed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

impl ProviderOutcome {
    pub fn succeeded(provider: Provider) -> Self {
        Self {
            provider,
            success: true,
            skipped: false,
            message: None,
            error: None,
            subscription_id: None,
            lead_id: None,
            resubscribed: false,
            response: None,
        }
    }

    /// Nothing went wrong, but nothing useful happened either.
    pub fn soft_failure(provider: Provider, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::succeeded(provider)
        }
    }

    pub fn not_configured(provider: Provider) -> Self {
        Self {
            skipped: true,
            ..Self::soft_failure(provider, format!("{provider} not configured"))
        }
    }

    pub fn failed(provider: Provider, error: impl fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::succeeded(provider)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Record a failure that happened after the outcome's main effect.
    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn with_subscription_id(mut self, id: impl Into<String>) -> Self {
        self.subscription_id = Some(id.into());
        self
    }

    pub fn with_lead_id(mut self, id: impl Into<String>) -> Self {
        self.lead_id = Some(id.into());
        self
    }

    pub fn resubscribed(mut self) -> Self {
        self.resubscribed = true;
        self
    }

    pub fn with_response(mut self, response: serde_json::Value) -> Self {
        self.response = Some(response);
        self
    }
}

/// The body returned to the preference page for a successful action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub success: bool,
    pub message: String,
    pub email: String,
    pub hubspot: Option<ProviderOutcome>,
    pub reachinbox: Option<ProviderOutcome>,
}

impl AggregateResult {
    pub fn new(message: impl Into<String>, email: &str) -> Self {
        Self {
            success: true,
            message: message.into(),
            email: email.to_string(),
            hubspot: None,
            reachinbox: None,
        }
    }

    pub fn with_hubspot(mut self, outcome: ProviderOutcome) -> Self {
        self.hubspot = Some(outcome);
        self
    }

    pub fn with_reachinbox(mut self, outcome: ProviderOutcome) -> Self {
        self.reachinbox = Some(outcome);
        self
    }
}
