use crate::config::Config;
use crate::types::{Lead, SubscriptionDefinition};
use reqwest::Response;
use thiserror::Error;
use tracing::warn;

pub mod hubspot;
pub mod reachinbox;
pub use hubspot::{HubSpotClient, is_hard_opt_out_error};
pub use reachinbox::ReachInboxClient;

/// Lead status ReachInbox shows for a recipient who opted out of a campaign.
pub const UNSUBSCRIBED_LEAD_STATUS: &str = "Unsubscribed";

// ============================================================================
// Errors
// ============================================================================

/// Why a provider rejected a request, as far as we can tell from its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The contact opted out of all email and needs the v4 re-subscribe call.
    HardOptOut,
    /// The contact, lead, or resource does not exist on the provider.
    NotFound,
    Other,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} failed: {status}")]
    Api {
        operation: &'static str,
        status: u16,
        reason: FailureReason,
        body: String,
    },
}

impl ProviderError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Http(_) => FailureReason::Other,
            Self::Api { reason, .. } => *reason,
        }
    }

    pub fn is_hard_opt_out(&self) -> bool {
        self.reason() == FailureReason::HardOptOut
    }

    pub fn is_not_found(&self) -> bool {
        self.reason() == FailureReason::NotFound
    }
}

/// Pass successful responses through; turn anything else into a classified
/// `ProviderError::Api`.
pub(crate) async fn ensure_success(
    operation: &'static str,
    response: Response,
    classify: fn(u16, &str) -> FailureReason,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!(operation, status, body = %body, "Provider request failed");

    Err(ProviderError::Api {
        operation,
        status,
        reason: classify(status, &body),
        body,
    })
}

// ============================================================================
// Provider traits
// ============================================================================

/// HubSpot communications-preferences operations.
#[allow(async_fn_in_trait)]
pub trait PreferencesProvider: Send + Sync {
    async fn list_definitions(&self) -> Result<Vec<SubscriptionDefinition>, ProviderError>;

    /// v3 subscribe. Fails with `FailureReason::HardOptOut` for contacts who
    /// opted out of all email.
    async fn subscribe(&self, email: &str, subscription_id: &str) -> Result<(), ProviderError>;

    /// v4 subscribe, which also works for hard-opted-out contacts.
    async fn resubscribe(&self, email: &str, subscription_id: &str) -> Result<(), ProviderError>;

    async fn unsubscribe(&self, email: &str, subscription_id: &str) -> Result<(), ProviderError>;

    /// Opt the contact out of every email subscription.
    async fn unsubscribe_all(&self, email: &str) -> Result<(), ProviderError>;
}

/// ReachInbox campaign and blocklist operations.
#[allow(async_fn_in_trait)]
pub trait CampaignProvider: Send + Sync {
    /// Returns the provider's response body, if it sent one.
    async fn add_to_blocklist(&self, email: &str) -> Result<serde_json::Value, ProviderError>;

    /// Email comparison is case-insensitive.
    async fn find_lead(
        &self,
        campaign_id: &str,
        email: &str,
    ) -> Result<Option<Lead>, ProviderError>;

    async fn update_lead_status(
        &self,
        campaign_id: &str,
        lead_id: &str,
        status: &str,
    ) -> Result<(), ProviderError>;
}

// ============================================================================
// Providers
// ============================================================================

/// The provider clients available to this process. A provider whose API key
/// is not configured is `None`, and actions skip it.
pub struct Providers<H, R> {
    pub hubspot: Option<H>,
    pub reachinbox: Option<R>,
    /// HubSpot subscription definition used for (re)subscribing. `None`
    /// selects the first definition HubSpot returns.
    pub subscription_id: Option<String>,
}

impl<H, R> Providers<H, R> {
    pub fn new(hubspot: Option<H>, reachinbox: Option<R>) -> Self {
        Self {
            hubspot,
            reachinbox,
            subscription_id: None,
        }
    }

    pub fn with_subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }
}

impl Providers<HubSpotClient, ReachInboxClient> {
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let hubspot = config
            .hubspot
            .as_ref()
            .map(|c| HubSpotClient::new(c, config.timeout))
            .transpose()?;
        let reachinbox = config
            .reachinbox
            .as_ref()
            .map(|c| ReachInboxClient::new(c, config.timeout))
            .transpose()?;

        Ok(Self {
            hubspot,
            reachinbox,
            subscription_id: config
                .hubspot
                .as_ref()
                .and_then(|c| c.subscription_id.clone()),
        })
    }
}

// ============================================================================
// Test utilities
// ============================================================================

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted failures keyed by operation name, plus a log of every call.
    #[derive(Default)]
    struct Script {
        failures: HashMap<&'static str, (u16, String)>,
        calls: Mutex<Vec<String>>,
    }

    impl Script {
        fn record(
            &self,
            operation: &'static str,
            args: &[&str],
            classify: fn(u16, &str) -> FailureReason,
        ) -> Result<(), ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{}", operation, args.join(":")));
            match self.failures.get(operation) {
                Some((status, body)) => Err(ProviderError::Api {
                    operation,
                    status: *status,
                    reason: classify(*status, body),
                    body: body.clone(),
                }),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeHubSpot {
        definitions: Vec<SubscriptionDefinition>,
        script: Script,
    }

    impl FakeHubSpot {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_definitions(mut self, defs: &[(&str, &str)]) -> Self {
            self.definitions = defs
                .iter()
                .map(|(id, name)| SubscriptionDefinition {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect();
            self
        }

        /// Make `operation` ("definitions", "subscribe", "resubscribe",
        /// "unsubscribe", "unsubscribe_all") fail with the given response.
        pub(crate) fn failing(mut self, operation: &'static str, status: u16, body: &str) -> Self {
            self.script
                .failures
                .insert(operation, (status, body.to_string()));
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.script.calls()
        }

        pub(crate) fn called(&self, operation: &str) -> bool {
            self.calls()
                .iter()
                .any(|c| c.split(':').next() == Some(operation))
        }
    }

    impl PreferencesProvider for FakeHubSpot {
        async fn list_definitions(&self) -> Result<Vec<SubscriptionDefinition>, ProviderError> {
            self.script
                .record("definitions", &[], hubspot::classify_failure)?;
            Ok(self.definitions.clone())
        }

        async fn subscribe(&self, email: &str, id: &str) -> Result<(), ProviderError> {
            self.script
                .record("subscribe", &[email, id], hubspot::classify_failure)
        }

        async fn resubscribe(&self, email: &str, id: &str) -> Result<(), ProviderError> {
            self.script
                .record("resubscribe", &[email, id], hubspot::classify_failure)
        }

        async fn unsubscribe(&self, email: &str, id: &str) -> Result<(), ProviderError> {
            self.script
                .record("unsubscribe", &[email, id], hubspot::classify_failure)
        }

        async fn unsubscribe_all(&self, email: &str) -> Result<(), ProviderError> {
            self.script
                .record("unsubscribe_all", &[email], hubspot::classify_failure)
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeReachInbox {
        leads: Vec<Lead>,
        script: Script,
    }

    impl FakeReachInbox {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_lead(mut self, id: &str, email: &str) -> Self {
            self.leads.push(Lead {
                id: id.to_string(),
                email: email.to_string(),
            });
            self
        }

        /// Make `operation` ("blocklist", "find_lead", "update_lead") fail
        /// with the given response.
        pub(crate) fn failing(mut self, operation: &'static str, status: u16, body: &str) -> Self {
            self.script
                .failures
                .insert(operation, (status, body.to_string()));
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.script.calls()
        }
    }

    impl CampaignProvider for FakeReachInbox {
        async fn add_to_blocklist(&self, email: &str) -> Result<serde_json::Value, ProviderError> {
            self.script
                .record("blocklist", &[email], reachinbox::classify_failure)?;
            Ok(serde_json::json!({ "status": 200, "message": "Emails added to blocklist" }))
        }

        async fn find_lead(
            &self,
            campaign_id: &str,
            email: &str,
        ) -> Result<Option<Lead>, ProviderError> {
            self.script
                .record("find_lead", &[campaign_id, email], reachinbox::classify_failure)?;
            Ok(self
                .leads
                .iter()
                .find(|l| l.email.eq_ignore_ascii_case(email))
                .cloned())
        }

        async fn update_lead_status(
            &self,
            campaign_id: &str,
            lead_id: &str,
            status: &str,
        ) -> Result<(), ProviderError> {
            self.script.record(
                "update_lead",
                &[campaign_id, lead_id, status],
                reachinbox::classify_failure,
            )
        }
    }
}
