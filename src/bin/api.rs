//! HTTP API Lambda for the email preference center.
//!
//! Adapts `lambda_http` types to the framework-agnostic `ApiRequest` /
//! `ApiResponse` and delegates to `preference_center::api::handle`.

use lambda_http::{Body, Error, Request, Response, run, service_fn};
use preference_center::api::{self, ApiRequest, ApiResponse};
use preference_center::config::Config;
use preference_center::providers::{HubSpotClient, Providers, ReachInboxClient};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env().map_err(|e| Error::from(e.to_string()))?;
    if config.hubspot.is_none() {
        warn!("HUBSPOT_API_KEY not set; HubSpot calls will be skipped");
    }
    if config.reachinbox.is_none() {
        warn!("REACHINBOX_API_KEY not set; ReachInbox calls will be skipped");
    }

    let providers = Arc::new(Providers::from_config(&config)?);

    run(service_fn(|event| handler(event, providers.clone()))).await
}

async fn handler(
    event: Request,
    providers: Arc<Providers<HubSpotClient, ReachInboxClient>>,
) -> Result<Response<Body>, Error> {
    let method = event.method().to_string();
    let path = event.uri().path().to_string();

    info!(method = %method, path = %path, "Handling request");

    let body = match event.body() {
        Body::Text(s) => Some(s.clone()),
        Body::Binary(b) => Some(String::from_utf8_lossy(b).into_owned()),
        _ => None,
    };

    let request = ApiRequest { method, path, body };
    let response = api::handle(&request, &providers).await;

    to_lambda_response(response)
}

fn to_lambda_response(response: ApiResponse) -> Result<Response<Body>, Error> {
    let mut builder = Response::builder().status(response.status());
    for (name, value) in response.headers() {
        builder = builder.header(name, value);
    }
    let body = match response {
        ApiResponse::Json { body, .. } => Body::from(body),
        ApiResponse::NoContent => Body::Empty,
    };
    Ok(builder.body(body)?)
}
