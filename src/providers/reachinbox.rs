//! ReachInbox cold-email API client: blocklist and campaign lead status.

use super::{CampaignProvider, FailureReason, ProviderError, ensure_success};
use crate::config::ReachInboxConfig;
use crate::types::Lead;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

#[derive(Serialize)]
struct BlocklistAddRequest<'a> {
    emails: [&'a str; 1],
}

#[derive(Deserialize)]
struct LeadsResponse {
    #[serde(default)]
    data: Vec<Lead>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadStatusRequest<'a> {
    campaign_id: &'a str,
    lead_id: &'a str,
    lead_status: &'a str,
}

pub(crate) fn classify_failure(status: u16, _body: &str) -> FailureReason {
    match status {
        404 => FailureReason::NotFound,
        _ => FailureReason::Other,
    }
}

pub struct ReachInboxClient {
    http_client: Client,
    api_key: Secret<String>,
    base_url: String,
}

impl ReachInboxClient {
    pub fn new(config: &ReachInboxConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl CampaignProvider for ReachInboxClient {
    async fn add_to_blocklist(&self, email: &str) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .http_client
            .post(self.url("/api/v1/blocklist/add"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&BlocklistAddRequest { emails: [email] })
            .send()
            .await?;
        let response =
            ensure_success("ReachInbox blocklist", response, classify_failure).await?;

        // The response body is informational; an empty or non-JSON body is fine.
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);

        info!(email = %email, "Added to ReachInbox blocklist");
        Ok(body)
    }

    async fn find_lead(
        &self,
        campaign_id: &str,
        email: &str,
    ) -> Result<Option<Lead>, ProviderError> {
        let response = self
            .http_client
            .get(self.url("/api/v1/leads"))
            .query(&[("campaignId", campaign_id), ("email", email)])
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?;
        let response =
            ensure_success("ReachInbox lead lookup", response, classify_failure).await?;
        let body: LeadsResponse = response.json().await?;

        Ok(body
            .data
            .into_iter()
            .find(|lead| lead.email.eq_ignore_ascii_case(email)))
    }

    async fn update_lead_status(
        &self,
        campaign_id: &str,
        lead_id: &str,
        status: &str,
    ) -> Result<(), ProviderError> {
        let response = self
            .http_client
            .post(self.url("/api/v1/leads"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&LeadStatusRequest {
                campaign_id,
                lead_id,
                lead_status: status,
            })
            .send()
            .await?;
        ensure_success("ReachInbox lead status update", response, classify_failure).await?;

        info!(campaign_id, lead_id, status, "Updated ReachInbox lead status");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ReachInboxClient {
        let config = ReachInboxConfig {
            api_key: Secret::new("ri-test-key".to_string()),
            base_url: server.uri(),
        };
        ReachInboxClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn blocklist_add_posts_single_email_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/blocklist/add"))
            .and(header("Authorization", "Bearer ri-test-key"))
            .and(body_json(serde_json::json!({"emails": ["a@b.com"]})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": 200, "message": "ok"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server)
            .await
            .add_to_blocklist("a@b.com")
            .await
            .unwrap();

        assert_eq!(body["message"], "ok");
    }

    #[tokio::test]
    async fn blocklist_add_tolerates_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/blocklist/add"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let body = client_for(&server)
            .await
            .add_to_blocklist("a@b.com")
            .await
            .unwrap();

        assert!(body.is_null());
    }

    #[tokio::test]
    async fn blocklist_failure_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/blocklist/add"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .add_to_blocklist("a@b.com")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "ReachInbox blocklist failed: 401");
    }

    #[tokio::test]
    async fn find_lead_matches_email_case_insensitively() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/leads"))
            .and(query_param("campaignId", "55"))
            .and(query_param("email", "a@b.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": 1, "email": "someone@else.com"},
                    {"id": 2, "email": "A@B.com", "firstName": "Ann"}
                ]
            })))
            .mount(&server)
            .await;

        let lead = client_for(&server)
            .await
            .find_lead("55", "a@b.com")
            .await
            .unwrap();

        assert_eq!(lead.map(|l| l.id), Some("2".to_string()));
    }

    #[tokio::test]
    async fn find_lead_with_no_results_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/leads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let lead = client_for(&server)
            .await
            .find_lead("55", "a@b.com")
            .await
            .unwrap();

        assert!(lead.is_none());
    }

    #[tokio::test]
    async fn find_lead_in_unknown_campaign_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/leads"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Campaign not found"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .find_lead("55", "a@b.com")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "ReachInbox lead lookup failed: 404");
    }

    #[tokio::test]
    async fn update_lead_status_posts_campaign_lead_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/leads"))
            .and(body_json(serde_json::json!({
                "campaignId": "55",
                "leadId": "2",
                "leadStatus": "Unsubscribed"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .update_lead_status("55", "2", "Unsubscribed")
            .await
            .unwrap();
    }
}
