//! Outbound HTTP for the conversion endpoint.
//!
//! Two interchangeable implementations sit behind [`Transport`]: the
//! `reqwest`-backed [`FetchTransport`] (feature `fetch`) and the raw-socket
//! [`SocketTransport`]. [`select_transport`] picks one once, at tracker
//! construction. Both run the reply through [`interpret_response`] so callers
//! see the same [`RawResponse`] and error kinds either way.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use pixelbridge_core::{response::RawResponse, TrackerError};

#[cfg(feature = "fetch")]
mod fetch;
mod socket;

#[cfg(feature = "fetch")]
pub use fetch::FetchTransport;
pub use socket::SocketTransport;

/// Capability interface: POST one JSON document, get back a parsed reply.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<RawResponse, TrackerError>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

/// Pick the transport for this build and endpoint.
///
/// With the `fetch` feature compiled in, the high-level client is always
/// used. Otherwise the socket transport is used, which only speaks plain
/// `http://`; an `https://` endpoint is a configuration error.
pub fn select_transport(url: &Url, timeout: Duration) -> Result<Arc<dyn Transport>, TrackerError> {
    #[cfg(feature = "fetch")]
    {
        let _ = url;
        Ok(Arc::new(FetchTransport::new(timeout)?))
    }
    #[cfg(not(feature = "fetch"))]
    {
        Ok(Arc::new(SocketTransport::for_url(url, timeout)?))
    }
}

/// Shared reply interpretation for every transport.
///
/// - non-2xx: `Api` with `error.message` and the trace id when present
/// - 2xx with an unparseable body: `Parse`
/// - 2xx with an empty body: an empty JSON object
pub fn interpret_response(status: u16, body: &[u8]) -> Result<RawResponse, TrackerError> {
    if !(200..300).contains(&status) {
        let parsed: Option<Value> = serde_json::from_slice(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("endpoint responded with status {status}"));
        let trace_id = error
            .and_then(|e| e.get("fbtrace_id"))
            .or_else(|| parsed.as_ref().and_then(|v| v.get("fbtrace_id")))
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(TrackerError::Api {
            status,
            message,
            trace_id,
        });
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RawResponse {
            status,
            body: Value::Object(Default::default()),
        });
    }

    let body: Value = serde_json::from_slice(body)
        .map_err(|e| TrackerError::parse(format!("invalid JSON in response body: {e}")))?;
    Ok(RawResponse { status, body })
}
