use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::debug;
use url::Url;

use pixelbridge_core::{
    config::TrackerConfig, event::WireEvent, response::RawResponse,
    validation::validate_batch_len, TrackerError,
};

use crate::transport::Transport;

type HmacSha256 = Hmac<Sha256>;

/// JSON body of a conversion submission.
#[derive(Debug, Serialize)]
pub struct RequestBody<'a> {
    pub data: &'a [WireEvent],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_event_code: Option<&'a str>,
    pub access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_agent: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appsecret_proof: Option<String>,
}

/// Hex HMAC-SHA256 of the access token keyed by the app secret.
pub fn appsecret_proof(app_secret: &str, access_token: &str) -> Result<String, TrackerError> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|e| TrackerError::config(format!("invalid app secret: {e}")))?;
    mac.update(access_token.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Sends already-built batches for one configuration snapshot.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    config: Arc<TrackerConfig>,
    url: Url,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<TrackerConfig>) -> Result<Self, TrackerError> {
        let url = config.endpoint_url()?;
        Ok(Self {
            transport,
            config,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn request_body(&self, events: &[WireEvent]) -> Result<serde_json::Value, TrackerError> {
        let access_token = self
            .config
            .access_token
            .as_deref()
            .ok_or_else(|| TrackerError::config("access_token is required for server-side tracking"))?;
        let proof = self
            .config
            .app_secret
            .as_deref()
            .map(|secret| appsecret_proof(secret, access_token))
            .transpose()?;
        let body = RequestBody {
            data: events,
            test_event_code: self.config.test_event_code.as_deref(),
            access_token,
            partner_agent: self.config.partner_agent.as_deref(),
            appsecret_proof: proof,
        };
        Ok(serde_json::to_value(&body)?)
    }

    /// One outbound request for the whole batch. Empty or oversized batches
    /// are rejected before anything touches the network.
    pub async fn send(&self, events: &[WireEvent]) -> Result<RawResponse, TrackerError> {
        validate_batch_len(events.len())?;
        let body = self.request_body(events)?;
        debug!(
            transport = self.transport.name(),
            events = events.len(),
            url = %self.url,
            "posting conversion batch"
        );
        self.transport.post_json(&self.url, &body).await
    }
}
