use super::{Action, ApiResponse};
use crate::providers::{CampaignProvider, PreferencesProvider, Providers};
use crate::types::{AggregateResult, PreferenceRequest, RequestError};
use crate::{subscribe, unsubscribe};
use tracing::{error, info, warn};

// ============================================================================
// Response helpers
// ============================================================================

fn parse_request(action: Action, body: &str) -> Result<PreferenceRequest, ApiResponse> {
    match PreferenceRequest::parse(body) {
        Ok(request) => Ok(request),
        Err(RequestError::MissingEmail) => {
            warn!(action = %action, "Request missing email");
            Err(ApiResponse::error(400, "Email is required"))
        }
        Err(RequestError::InvalidBody(e)) => {
            warn!(action = %action, error = %e, "Failed to parse request body");
            Err(ApiResponse::json(
                400,
                &serde_json::json!({
                    "error": "Invalid request body",
                    "details": e.to_string(),
                }),
            ))
        }
    }
}

fn respond(action: Action, result: anyhow::Result<AggregateResult>) -> ApiResponse {
    let result = match result {
        Ok(r) => r,
        Err(e) => {
            error!(action = %action, error = %e, "Failed to process request");
            return ApiResponse::json(
                500,
                &serde_json::json!({
                    "error": action.failure_message(),
                    "details": e.to_string(),
                }),
            );
        }
    };

    match serde_json::to_value(&result) {
        Ok(body) => {
            info!(action = %action, email = %result.email, "Request processed");
            ApiResponse::json(200, &body)
        }
        Err(e) => {
            error!(action = %action, error = %e, "Failed to serialize response");
            ApiResponse::error(500, action.failure_message())
        }
    }
}

// ============================================================================
// Route handlers
// ============================================================================

/// POST /api/subscribe
///
/// Re-subscribes the recipient on HubSpot.
pub(super) async fn subscribe_post<H, R>(providers: &Providers<H, R>, body: &str) -> ApiResponse
where
    H: PreferencesProvider,
    R: CampaignProvider,
{
    let action = Action::Subscribe;
    let request = match parse_request(action, body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    respond(action, subscribe::subscribe(providers, &request).await)
}

/// POST /api/unsubscribe-campaign
///
/// Unsubscribes the recipient from one campaign, on the provider named by
/// `source` or on both when the source is unknown.
pub(super) async fn unsubscribe_campaign_post<H, R>(
    providers: &Providers<H, R>,
    body: &str,
) -> ApiResponse
where
    H: PreferencesProvider,
    R: CampaignProvider,
{
    let action = Action::UnsubscribeCampaign;
    let request = match parse_request(action, body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    respond(
        action,
        unsubscribe::unsubscribe_from_campaign(providers, &request).await,
    )
}

/// POST /api/unsubscribe-all
///
/// Opts the recipient out of all HubSpot email and blocklists them on
/// ReachInbox.
pub(super) async fn unsubscribe_all_post<H, R>(
    providers: &Providers<H, R>,
    body: &str,
) -> ApiResponse
where
    H: PreferencesProvider,
    R: CampaignProvider,
{
    let action = Action::UnsubscribeAll;
    let request = match parse_request(action, body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    respond(
        action,
        unsubscribe::unsubscribe_from_all(providers, &request).await,
    )
}

// ============================================================================
// Tests
// ============================================================================
