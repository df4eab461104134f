//! Business logic for unsubscribing a recipient from one campaign or from
//! everything.
//!
//! When both providers are involved their calls run concurrently and each
//! provider's failure is captured in its own outcome, so one provider being
//! down never blocks the other.

use crate::providers::{
    CampaignProvider, PreferencesProvider, ProviderError, Providers, UNSUBSCRIBED_LEAD_STATUS,
};
use crate::types::{
    AggregateResult, PreferenceRequest, Provider, ProviderOutcome, Source, SubscriptionDefinition,
};
use anyhow::Result;
use tracing::{error, info, warn};

/// Turn a provider call's result into an outcome, capturing hard failures.
fn settle(provider: Provider, result: Result<ProviderOutcome, ProviderError>) -> ProviderOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(provider = %provider, error = %e, "Provider call failed");
            ProviderOutcome::failed(provider, e)
        }
    }
}

/// Find a definition whose name contains the campaign name or is contained
/// by it, ignoring case.
fn match_definition<'a>(
    definitions: &'a [SubscriptionDefinition],
    campaign: &str,
) -> Option<&'a SubscriptionDefinition> {
    let campaign = campaign.to_lowercase();
    definitions.iter().find(|d| {
        let name = d.name.trim().to_lowercase();
        !name.is_empty() && (name.contains(&campaign) || campaign.contains(&name))
    })
}

// ============================================================================
// HubSpot
// ============================================================================

async fn unsubscribe_hubspot_campaign<H: PreferencesProvider>(
    hubspot: &H,
    request: &PreferenceRequest,
) -> Result<ProviderOutcome, ProviderError> {
    let subscription_id = match &request.campaign_id {
        Some(id) => id.clone(),
        None => {
            let definitions = hubspot.list_definitions().await?;
            let definition = match request.campaign_name() {
                Some(name) => match match_definition(&definitions, name) {
                    Some(d) => d,
                    None => {
                        info!(campaign = %name, "No HubSpot subscription matches campaign");
                        return Ok(ProviderOutcome::succeeded(Provider::HubSpot)
                            .with_message("Campaign not found, no action taken"));
                    }
                },
                None => match definitions.first() {
                    Some(d) => d,
                    None => {
                        warn!("HubSpot returned no subscription definitions");
                        return Ok(ProviderOutcome::soft_failure(
                            Provider::HubSpot,
                            "No subscription ID found",
                        ));
                    }
                },
            };
            definition.id.clone()
        }
    };

    hubspot.unsubscribe(&request.email, &subscription_id).await?;
    Ok(ProviderOutcome::succeeded(Provider::HubSpot).with_subscription_id(subscription_id))
}

async fn unsubscribe_hubspot_all<H: PreferencesProvider>(
    hubspot: &H,
    email: &str,
) -> Result<ProviderOutcome, ProviderError> {
    match hubspot.unsubscribe_all(email).await {
        Ok(()) => Ok(ProviderOutcome::succeeded(Provider::HubSpot)),
        Err(e) if e.is_not_found() => {
            info!(email = %email, "Contact not found in HubSpot, no action needed");
            Ok(ProviderOutcome::succeeded(Provider::HubSpot)
                .with_message("Contact not found in HubSpot"))
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// ReachInbox
// ============================================================================

async fn blocklist<R: CampaignProvider>(
    reachinbox: &R,
    email: &str,
) -> Result<ProviderOutcome, ProviderError> {
    let response = reachinbox.add_to_blocklist(email).await?;
    let outcome = ProviderOutcome::succeeded(Provider::ReachInbox);
    Ok(if response.is_null() {
        outcome
    } else {
        outcome.with_response(response)
    })
}

/// Find the recipient's lead in a campaign and mark it unsubscribed. A lead
/// or campaign ReachInbox does not know about yields `None`.
async fn mark_lead_unsubscribed<R: CampaignProvider>(
    reachinbox: &R,
    campaign_id: &str,
    email: &str,
) -> Result<Option<String>, ProviderError> {
    let lead = match reachinbox.find_lead(campaign_id, email).await {
        Ok(lead) => lead,
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };
    let Some(lead) = lead else {
        return Ok(None);
    };

    reachinbox
        .update_lead_status(campaign_id, &lead.id, UNSUBSCRIBED_LEAD_STATUS)
        .await?;
    Ok(Some(lead.id))
}

/// Blocklist the address and, when the link named a campaign, mark the lead
/// unsubscribed in that campaign too.
///
/// Once the blocklist call succeeds the recipient is opted out, so a failed
/// lead update is recorded on the outcome instead of failing the request.
async fn unsubscribe_reachinbox_campaign<R: CampaignProvider>(
    reachinbox: &R,
    email: &str,
    campaign_id: Option<&str>,
) -> Result<ProviderOutcome, ProviderError> {
    let outcome = blocklist(reachinbox, email).await?;

    let Some(campaign_id) = campaign_id else {
        return Ok(outcome);
    };

    let outcome = match mark_lead_unsubscribed(reachinbox, campaign_id, email).await {
        Ok(Some(lead_id)) => outcome.with_lead_id(lead_id),
        Ok(None) => {
            info!(email = %email, campaign_id, "Lead not found in ReachInbox campaign");
            outcome.with_message("Lead not found")
        }
        Err(e) => {
            warn!(
                email = %email,
                campaign_id,
                error = %e,
                "Blocklisted, but lead status update failed"
            );
            outcome
                .with_message("Blocklisted, but lead status update failed")
                .with_error(e)
        }
    };
    Ok(outcome)
}

// ============================================================================
// Actions
// ============================================================================

/// Handle an unsubscribe-from-campaign action, routed by where the email came
/// from:
///
/// - `reachinbox`: ReachInbox only
/// - `hubspot`: HubSpot only
/// - unknown: both, concurrently
///
/// On single-provider routes a provider failure propagates to the caller.
pub async fn unsubscribe_from_campaign<H, R>(
    providers: &Providers<H, R>,
    request: &PreferenceRequest,
) -> Result<AggregateResult>
where
    H: PreferencesProvider,
    R: CampaignProvider,
{
    info!(
        email = %request.email,
        campaign = %request.campaign_label(),
        campaign_id = ?request.campaign_id,
        source = %request.source,
        "Processing campaign unsubscribe"
    );

    let result = AggregateResult::new(
        format!("Successfully unsubscribed from {}", request.campaign_label()),
        &request.email,
    );

    let result = match request.source {
        Source::ReachInbox => {
            let outcome = match &providers.reachinbox {
                Some(reachinbox) => {
                    unsubscribe_reachinbox_campaign(
                        reachinbox,
                        &request.email,
                        request.campaign_id.as_deref(),
                    )
                    .await?
                }
                None => ProviderOutcome::not_configured(Provider::ReachInbox),
            };
            result.with_reachinbox(outcome)
        }
        Source::HubSpot => {
            let outcome = match &providers.hubspot {
                Some(hubspot) => unsubscribe_hubspot_campaign(hubspot, request).await?,
                None => ProviderOutcome::not_configured(Provider::HubSpot),
            };
            result.with_hubspot(outcome)
        }
        Source::Unknown => {
            // The campaign id's meaning depends on the provider, so with an
            // unknown source ReachInbox only gets the blocklist.
            let (hubspot, reachinbox) = tokio::join!(
                async {
                    match &providers.hubspot {
                        Some(hubspot) => unsubscribe_hubspot_campaign(hubspot, request).await,
                        None => Ok(ProviderOutcome::not_configured(Provider::HubSpot)),
                    }
                },
                async {
                    match &providers.reachinbox {
                        Some(reachinbox) => blocklist(reachinbox, &request.email).await,
                        None => Ok(ProviderOutcome::not_configured(Provider::ReachInbox)),
                    }
                },
            );
            result
                .with_hubspot(settle(Provider::HubSpot, hubspot))
                .with_reachinbox(settle(Provider::ReachInbox, reachinbox))
        }
    };

    Ok(result)
}

/// Handle an unsubscribe-from-everything action. Both providers are always
/// asked, concurrently, and failures are captured per provider.
pub async fn unsubscribe_from_all<H, R>(
    providers: &Providers<H, R>,
    request: &PreferenceRequest,
) -> Result<AggregateResult>
where
    H: PreferencesProvider,
    R: CampaignProvider,
{
    info!(email = %request.email, "Processing unsubscribe from all");

    let (hubspot, reachinbox) = tokio::join!(
        async {
            match &providers.hubspot {
                Some(hubspot) => unsubscribe_hubspot_all(hubspot, &request.email).await,
                None => Ok(ProviderOutcome::not_configured(Provider::HubSpot)),
            }
        },
        async {
            match &providers.reachinbox {
                Some(reachinbox) => blocklist(reachinbox, &request.email).await,
                None => Ok(ProviderOutcome::not_configured(Provider::ReachInbox)),
            }
        },
    );

    Ok(
        AggregateResult::new("Successfully unsubscribed from all emails", &request.email)
            .with_hubspot(settle(Provider::HubSpot, hubspot))
            .with_reachinbox(settle(Provider::ReachInbox, reachinbox)),
    )
}

// ============================================================================
// Tests
// ============================================================================
