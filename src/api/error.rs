use thiserror::Error;

/// Failures of outbound geocoding / facility-source calls
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} rate limited the request")]
    RateLimited { provider: &'static str },

    #[error("{provider} returned error status: {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("failed to send request to {provider}: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse {provider} response: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("no {provider} endpoint configured")]
    NoEndpoint { provider: &'static str },

    #[error("{provider} call abandoned: search deadline exceeded")]
    DeadlineExceeded { provider: &'static str },
}

impl ProviderError {
    /// Throttling and gateway timeouts are worth a delayed retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } => true,
            ProviderError::Status { status, .. } => matches!(status, 502..=504),
            ProviderError::Transport { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Map a non-success HTTP status to the matching error.
    pub fn from_status(provider: &'static str, status: u16) -> Self {
        if status == 429 {
            ProviderError::RateLimited { provider }
        } else {
            ProviderError::Status { provider, status }
        }
    }
}
