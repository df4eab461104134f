//! Run a preference action by hand, e.g. for a recipient who replied asking
//! to be removed instead of using the preference page.

use anyhow::{Context, Result};
use preference_center::api::Action;
use preference_center::config::Config;
use preference_center::providers::Providers;
use preference_center::types::{PreferenceRequest, Source};
use preference_center::{subscribe, unsubscribe};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!(
            "Usage: cargo run --bin preference-center <subscribe|unsubscribe-campaign|unsubscribe-all> <email> [source] [campaign-id]"
        );
        eprintln!(
            "Example: HUBSPOT_API_KEY=... cargo run --bin preference-center unsubscribe-campaign someone@example.com hubspot 12345"
        );
        std::process::exit(1);
    }

    let action: Action = args[1].parse()?;
    let mut request = PreferenceRequest::new(args[2].trim());
    if request.email.is_empty() {
        anyhow::bail!("Email is required");
    }
    if let Some(source) = args.get(3) {
        request = request.with_source(Source::from_label(source));
    }
    if let Some(campaign_id) = args.get(4) {
        request = request.with_campaign_id(campaign_id.as_str());
    }

    let config = Config::from_env()?;
    let providers =
        Providers::from_config(&config).context("Failed to initialize provider clients")?;

    println!("Running {} for {}", action, request.email);
    let result = match action {
        Action::Subscribe => subscribe::subscribe(&providers, &request).await?,
        Action::UnsubscribeCampaign => {
            unsubscribe::unsubscribe_from_campaign(&providers, &request).await?
        }
        Action::UnsubscribeAll => unsubscribe::unsubscribe_from_all(&providers, &request).await?,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
