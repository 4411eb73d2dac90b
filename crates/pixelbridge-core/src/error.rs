use thiserror::Error;

/// Every failure the tracker can surface.
///
/// `Config` is returned synchronously from constructors. The remaining
/// variants come back from the async send path. Only `Network` and `Api`
/// are retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrackerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("api error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        trace_id: Option<String>,
    },

    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Validation,
    Network,
    Api,
    Parse,
}

impl TrackerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::Config(_) => ErrorKind::Config,
            TrackerError::Validation(_) => ErrorKind::Validation,
            TrackerError::Network(_) => ErrorKind::Network,
            TrackerError::Api { .. } => ErrorKind::Api,
            TrackerError::Parse(_) => ErrorKind::Parse,
        }
    }

    /// Remote trace id for support correlation, only present on API errors.
    pub fn trace_id(&self) -> Option<&str> {
        match self {
            TrackerError::Api { trace_id, .. } => trace_id.as_deref(),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::Network(_) | TrackerError::Api { .. })
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Parse(e.to_string())
    }
}
