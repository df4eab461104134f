//! HubSpot communications-preferences API client.
//!
//! Straightforward subscribe/unsubscribe go through the v3 API. Contacts who
//! opted out of all email can only be re-subscribed through v4, which is also
//! where the bulk unsubscribe-all endpoint lives.

use super::{FailureReason, PreferencesProvider, ProviderError, ensure_success};
use crate::config::HubSpotConfig;
use crate::types::SubscriptionDefinition;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const LEGAL_BASIS: &str = "CONSENT_WITH_NOTICE";
const CHANNEL_EMAIL: &str = "EMAIL";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionsResponse {
    #[serde(default)]
    subscription_definitions: Vec<SubscriptionDefinition>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct V3StatusRequest<'a> {
    email_address: &'a str,
    subscription_id: &'a str,
    legal_basis: &'a str,
    legal_basis_explanation: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct V4SubscribeRequest<'a> {
    subscription_id: &'a str,
    channel: &'a str,
    legal_basis: &'a str,
    legal_basis_explanation: &'a str,
}

#[derive(Serialize)]
struct V4UnsubscribeAllRequest<'a> {
    channel: &'a str,
}

/// HubSpot's standard error payload. The category is a generic
/// `VALIDATION_ERROR`, so only the text carries the opt-out signal.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// Error classification
// ============================================================================

/// Whether a failed v3 subscribe was rejected because the contact has opted
/// out of all email. HubSpot exposes no dedicated error code for this, so the
/// top-level message and then the whole body (nested `errors[].message`
/// included) are searched for "opted out".
pub fn is_hard_opt_out_error(body: &str) -> bool {
    let mentions_opt_out = |text: &str| text.to_ascii_lowercase().contains("opted out");
    serde_json::from_str::<ErrorBody>(body).is_ok_and(|e| mentions_opt_out(&e.message))
        || mentions_opt_out(body)
}

pub(crate) fn classify_failure(status: u16, body: &str) -> FailureReason {
    match status {
        400 if is_hard_opt_out_error(body) => FailureReason::HardOptOut,
        404 => FailureReason::NotFound,
        _ => FailureReason::Other,
    }
}

// ============================================================================
// HubSpotClient
// ============================================================================

pub struct HubSpotClient {
    http_client: Client,
    api_key: Secret<String>,
    base_url: String,
}

impl HubSpotClient {
    pub fn new(config: &HubSpotConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: Serialize>(
        &self,
        operation: &'static str,
        path: &str,
        body: &T,
    ) -> Result<(), ProviderError> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;
        ensure_success(operation, response, classify_failure).await?;
        Ok(())
    }
}

fn statuses_path(email: &str, action: &str) -> String {
    format!(
        "/communication-preferences/v4/statuses/{}/{}",
        urlencoding::encode(email),
        action
    )
}

impl PreferencesProvider for HubSpotClient {
    async fn list_definitions(&self) -> Result<Vec<SubscriptionDefinition>, ProviderError> {
        let response = self
            .http_client
            .get(format!(
                "{}/communication-preferences/v3/definitions",
                self.base_url
            ))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?;
        let response =
            ensure_success("HubSpot list definitions", response, classify_failure).await?;
        let body: DefinitionsResponse = response.json().await?;

        info!(
            definitions = ?body
                .subscription_definitions
                .iter()
                .map(|d| (&d.id, &d.name))
                .collect::<Vec<_>>(),
            "Fetched HubSpot subscription definitions"
        );
        Ok(body.subscription_definitions)
    }

    async fn subscribe(&self, email: &str, subscription_id: &str) -> Result<(), ProviderError> {
        let body = V3StatusRequest {
            email_address: email,
            subscription_id,
            legal_basis: LEGAL_BASIS,
            legal_basis_explanation: "User opted in via email preference center",
        };
        self.post(
            "HubSpot subscribe",
            "/communication-preferences/v3/subscribe",
            &body,
        )
        .await?;
        info!(email = %email, subscription_id, "HubSpot subscribe succeeded");
        Ok(())
    }

    async fn resubscribe(&self, email: &str, subscription_id: &str) -> Result<(), ProviderError> {
        let body = V4SubscribeRequest {
            subscription_id,
            channel: CHANNEL_EMAIL,
            legal_basis: LEGAL_BASIS,
            legal_basis_explanation: "User re-subscribed via email preference center",
        };
        self.post(
            "HubSpot v4 re-subscribe",
            &statuses_path(email, "subscribe"),
            &body,
        )
        .await?;
        info!(email = %email, subscription_id, "HubSpot v4 re-subscribe succeeded");
        Ok(())
    }

    async fn unsubscribe(&self, email: &str, subscription_id: &str) -> Result<(), ProviderError> {
        let body = V3StatusRequest {
            email_address: email,
            subscription_id,
            legal_basis: LEGAL_BASIS,
            legal_basis_explanation: "User opted out via email preference center",
        };
        self.post(
            "HubSpot unsubscribe",
            "/communication-preferences/v3/unsubscribe",
            &body,
        )
        .await?;
        info!(email = %email, subscription_id, "HubSpot unsubscribe succeeded");
        Ok(())
    }

    async fn unsubscribe_all(&self, email: &str) -> Result<(), ProviderError> {
        let body = V4UnsubscribeAllRequest {
            channel: CHANNEL_EMAIL,
        };
        self.post(
            "HubSpot unsubscribe-all",
            &statuses_path(email, "unsubscribe-all"),
            &body,
        )
        .await?;
        info!(email = %email, "HubSpot unsubscribe-all succeeded");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
