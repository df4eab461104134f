//! Business logic for re-subscribing a recipient.
//!
//! Subscribing only touches HubSpot: ReachInbox campaigns are cold outreach
//! and have no opt-in to restore.

use crate::providers::{CampaignProvider, PreferencesProvider, ProviderError, Providers};
use crate::types::{
    AggregateResult, PreferenceRequest, Provider, ProviderOutcome, SubscriptionDefinition,
};
use anyhow::Result;
use tracing::{info, warn};

/// Pick the configured definition, or the first one HubSpot lists.
fn select_definition<'a>(
    definitions: &'a [SubscriptionDefinition],
    configured_id: Option<&str>,
) -> Option<&'a SubscriptionDefinition> {
    match configured_id {
        Some(id) => definitions.iter().find(|d| d.id == id),
        None => definitions.first(),
    }
}

/// Subscribe the contact to the configured HubSpot subscription.
///
/// A contact who previously opted out of all email is rejected by the v3
/// endpoint; in that case the subscription is restored through v4 instead.
pub(crate) async fn subscribe_hubspot<H: PreferencesProvider>(
    hubspot: &H,
    configured_id: Option<&str>,
    email: &str,
) -> Result<ProviderOutcome, ProviderError> {
    let definitions = hubspot.list_definitions().await?;

    let Some(definition) = select_definition(&definitions, configured_id) else {
        warn!(configured_id = ?configured_id, "No HubSpot subscription type found");
        return Ok(ProviderOutcome::soft_failure(
            Provider::HubSpot,
            "No subscription type configured",
        ));
    };

    let resubscribed = match hubspot.subscribe(email, &definition.id).await {
        Ok(()) => false,
        Err(e) if e.is_hard_opt_out() => {
            info!(email = %email, "Contact previously opted out, re-subscribing through v4");
            hubspot.resubscribe(email, &definition.id).await?;
            true
        }
        Err(e) => return Err(e),
    };

    let outcome =
        ProviderOutcome::succeeded(Provider::HubSpot).with_subscription_id(definition.id.clone());
    Ok(if resubscribed {
        outcome.resubscribed()
    } else {
        outcome
    })
}

/// Handle a subscribe action. HubSpot failures other than the soft cases
/// propagate to the caller.
pub async fn subscribe<H, R>(
    providers: &Providers<H, R>,
    request: &PreferenceRequest,
) -> Result<AggregateResult>
where
    H: PreferencesProvider,
    R: CampaignProvider,
{
    info!(email = %request.email, source = %request.source, "Processing subscription");

    let outcome = match &providers.hubspot {
        Some(hubspot) => {
            subscribe_hubspot(hubspot, providers.subscription_id.as_deref(), &request.email)
                .await?
        }
        None => {
            warn!("HubSpot API key not configured");
            ProviderOutcome::not_configured(Provider::HubSpot)
        }
    };

    Ok(AggregateResult::new("Successfully subscribed", &request.email).with_hubspot(outcome))
}

// ============================================================================
// Tests
// ============================================================================
