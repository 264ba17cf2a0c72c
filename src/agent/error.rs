//! Error types for agent operations.

use thiserror::Error;

/// Errors that can occur while talking to a generation or embedding backend.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Network connectivity error (DNS, connection refused, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Backend answered 429.
    #[error("Rate limited by backend: {0}")]
    RateLimited(String),

    /// Backend returned any other error status.
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Method not supported by this agent implementation.
    #[error("Method '{0}' not supported by this agent")]
    Unsupported(&'static str),

    /// Backend response doesn't match expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Agent configuration error (missing API key, bad URL).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AgentError {
    /// Transient failures worth another attempt: rate limits, timeouts,
    /// connection problems and 5xx answers. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Network(_) | AgentError::Timeout(_) | AgentError::RateLimited(_) => true,
            AgentError::Upstream { status, .. } => (500..=599).contains(status),
            AgentError::Unsupported(_)
            | AgentError::InvalidResponse(_)
            | AgentError::Configuration(_) => false,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Network(_) => "network",
            AgentError::Timeout(_) => "timeout",
            AgentError::RateLimited(_) => "rate_limited",
            AgentError::Upstream { .. } => "upstream",
            AgentError::Unsupported(_) => "unsupported",
            AgentError::InvalidResponse(_) => "invalid_response",
            AgentError::Configuration(_) => "configuration",
        }
    }
}
