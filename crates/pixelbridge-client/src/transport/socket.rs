use std::{net::SocketAddr, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::debug;
use url::{Host, Url};

use pixelbridge_core::{response::RawResponse, TrackerError};

use super::{interpret_response, Transport};

/// Plain-TCP HTTP/1.1 transport with hand-written framing.
///
/// One connection per request (`Connection: close`); the reply is read to
/// EOF and then decoded (`Content-Length` or chunked).
pub struct SocketTransport {
    timeout: Duration,
}

impl SocketTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Fails for anything but `http://` since no TLS stack is involved.
    pub fn for_url(url: &Url, timeout: Duration) -> Result<Self, TrackerError> {
        if url.scheme() != "http" {
            return Err(TrackerError::config(format!(
                "socket transport cannot reach {} endpoints; enable the `fetch` feature",
                url.scheme()
            )));
        }
        Ok(Self::new(timeout))
    }

    async fn round_trip(&self, url: &Url, body: &str) -> Result<(u16, Vec<u8>), TrackerError> {
        let mut stream = connect(url).await?;

        let request = frame_request(url, body);
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| TrackerError::network(format!("write failed: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| TrackerError::network(format!("flush failed: {e}")))?;

        let mut raw = Vec::new();
        stream
            .read_to_end(&mut raw)
            .await
            .map_err(|e| TrackerError::network(format!("read failed: {e}")))?;
        debug!(bytes = raw.len(), "socket transport read response");

        parse_response(&raw)
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<RawResponse, TrackerError> {
        let payload = body.to_string();
        let (status, bytes) = tokio::time::timeout(self.timeout, self.round_trip(url, &payload))
            .await
            .map_err(|_| TrackerError::network(format!("request timed out after {:?}", self.timeout)))??;
        interpret_response(status, &bytes)
    }

    fn name(&self) -> &'static str {
        "socket"
    }
}

/// IP literals connect directly; only domain names go through resolution.
async fn connect(url: &Url) -> Result<TcpStream, TrackerError> {
    let port = url
        .port_or_known_default()
        .ok_or_else(|| TrackerError::config("endpoint url missing port"))?;
    let connected = match url.host() {
        Some(Host::Ipv4(ip)) => TcpStream::connect(SocketAddr::from((ip, port))).await,
        Some(Host::Ipv6(ip)) => TcpStream::connect(SocketAddr::from((ip, port))).await,
        Some(Host::Domain(domain)) => TcpStream::connect((domain, port)).await,
        None => return Err(TrackerError::config("endpoint url missing host")),
    };
    connected.map_err(|e| {
        TrackerError::network(format!(
            "connect to {}:{port} failed: {e}",
            url.host_str().unwrap_or_default()
        ))
    })
}

pub(crate) fn frame_request(url: &Url, body: &str) -> String {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    let host = url.host_str().unwrap_or_default();
    let host_header = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    format!(
        "POST {target} HTTP/1.1\r\n\
         Host: {host_header}\r\n\
         Content-Type: application/json\r\n\
         Accept: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    )
}

pub(crate) fn parse_response(raw: &[u8]) -> Result<(u16, Vec<u8>), TrackerError> {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| TrackerError::network("incomplete HTTP response head"))?;
    let head = std::str::from_utf8(&raw[..split])
        .map_err(|_| TrackerError::network("HTTP response head is not UTF-8"))?;
    let body = &raw[split + 4..];

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| TrackerError::network(format!("malformed status line: {status_line}")))?;

    let mut content_length = None;
    let mut chunked = false;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().ok();
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && value.to_ascii_lowercase().contains("chunked")
        {
            chunked = true;
        }
    }

    let body = if chunked {
        decode_chunked(body)?
    } else if let Some(len) = content_length {
        if body.len() < len {
            return Err(TrackerError::network("connection closed before full body"));
        }
        body[..len].to_vec()
    } else {
        body.to_vec()
    };
    Ok((status, body))
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>, TrackerError> {
    let mut out = Vec::new();
    loop {
        let line_end = data
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| TrackerError::network("truncated chunk header"))?;
        let size_str = std::str::from_utf8(&data[..line_end])
            .map_err(|_| TrackerError::network("chunk size is not UTF-8"))?;
        let size_hex = size_str.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| TrackerError::network(format!("bad chunk size: {size_hex}")))?;
        data = &data[line_end + 2..];
        if size == 0 {
            return Ok(out);
        }
        let end = size
            .checked_add(2)
            .filter(|n| data.len() >= *n)
            .ok_or_else(|| TrackerError::network("truncated chunk"))?;
        out.extend_from_slice(&data[..size]);
        data = &data[end..];
    }
}
