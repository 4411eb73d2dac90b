use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use pixelbridge_core::{response::RawResponse, TrackerError};

use super::{interpret_response, Transport};

/// `reqwest`-backed transport.
pub struct FetchTransport {
    client: reqwest::Client,
}

impl FetchTransport {
    pub fn new(timeout: Duration) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TrackerError::config(format!("http client build failed: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for FetchTransport {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<RawResponse, TrackerError> {
        let response = self
            .client
            .post(url.clone())
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| TrackerError::network(format!("request failed: {e}")))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TrackerError::network(format!("reading response failed: {e}")))?;
        interpret_response(status, &bytes)
    }

    fn name(&self) -> &'static str {
        "fetch"
    }
}
