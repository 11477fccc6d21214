//! Purge API client.
//!
//! Thin transport wrapper over the CDN's `purge_cache` endpoint: one
//! authenticated POST per call, outcome classified for the caller. Retry
//! policy deliberately lives upstream; this client never retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;
use tracing::debug;

use autopurge_api_types::{ApiEnvelope, PurgePayload};

use super::batch::PurgeSink;
use super::config::PurgeConfig;
use crate::infra::error::InfraError;

const SOURCE: &str = "purge::client";

/// Outcome classification for a purge call.
#[derive(Debug, Error)]
pub enum PurgeError {
    /// API token or zone id missing; no call was attempted.
    #[error("purge client not configured: api token and zone id are required")]
    Misconfigured,
    /// Connection or timeout failure before a response arrived.
    #[error("purge transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The API was reachable but rejected the request. The body is kept
    /// verbatim for diagnostics.
    #[error("purge api rejected request: status {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone)]
struct Endpoint {
    url: Url,
    token: String,
}

/// Authenticated client for the cache-purge API.
///
/// Constructed once at startup; when credentials are absent every
/// [`send`](PurgeClient::send) fails fast with
/// [`PurgeError::Misconfigured`] and performs no network I/O.
pub struct PurgeClient {
    http: reqwest::Client,
    endpoint: Option<Endpoint>,
}

impl PurgeClient {
    /// Build the client from purge configuration.
    ///
    /// A malformed `api_base` is a bootstrap error; missing credentials are
    /// not — they just leave the client unconfigured.
    pub fn from_config(config: &PurgeConfig) -> Result<Self, InfraError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build http client: {err}"))
            })?;

        let endpoint = match (&config.api_token, &config.zone_id) {
            (Some(token), Some(zone)) if !token.is_empty() && !zone.is_empty() => {
                let raw = format!(
                    "{}/zones/{}/purge_cache",
                    config.api_base.trim_end_matches('/'),
                    zone
                );
                let url = Url::parse(&raw).map_err(|err| {
                    InfraError::configuration(format!("invalid purge api base `{raw}`: {err}"))
                })?;
                Some(Endpoint {
                    url,
                    token: token.clone(),
                })
            }
            _ => None,
        };

        Ok(Self { http, endpoint })
    }

    /// Whether credentials are present and calls will actually go out.
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Perform one authenticated purge call.
    ///
    /// Success requires an HTTP 200 whose envelope reports `success: true`;
    /// a 200 carrying `success: false` is still [`PurgeError::Api`].
    pub async fn send(&self, payload: &PurgePayload) -> Result<(), PurgeError> {
        let Some(endpoint) = &self.endpoint else {
            return Err(PurgeError::Misconfigured);
        };

        let response = self
            .http
            .post(endpoint.url.clone())
            .bearer_auth(&endpoint.token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PurgeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiEnvelope = serde_json::from_str(&body).unwrap_or_default();
        if !envelope.success {
            return Err(PurgeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            target_module = SOURCE,
            items = payload.len(),
            "purge call accepted"
        );
        Ok(())
    }
}

#[async_trait]
impl PurgeSink for PurgeClient {
    async fn submit(&self, payload: &PurgePayload) -> Result<(), PurgeError> {
        self.send(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>, zone: Option<&str>) -> PurgeConfig {
        PurgeConfig {
            api_token: token.map(str::to_string),
            zone_id: zone.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn configured_with_both_credentials() {
        let client = PurgeClient::from_config(&config(Some("t"), Some("z"))).unwrap();
        assert!(client.is_configured());
    }

    #[test]
    fn unconfigured_without_token() {
        let client = PurgeClient::from_config(&config(None, Some("z"))).unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn unconfigured_without_zone() {
        let client = PurgeClient::from_config(&config(Some("t"), None)).unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn empty_credentials_count_as_absent() {
        let client = PurgeClient::from_config(&config(Some(""), Some("z"))).unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn malformed_api_base_is_a_bootstrap_error() {
        let bad = PurgeConfig {
            api_base: "not a url".to_string(),
            ..config(Some("t"), Some("z"))
        };
        assert!(PurgeClient::from_config(&bad).is_err());
    }

    #[tokio::test]
    async fn misconfigured_send_fails_fast_without_io() {
        let client = PurgeClient::from_config(&config(None, None)).unwrap();
        let result = client.send(&PurgePayload::everything()).await;
        assert!(matches!(result, Err(PurgeError::Misconfigured)));
    }
}
