use thiserror::Error;

/// Typed error hierarchy for reelay.
///
/// Use at module boundaries (webhook intake, store invariants, config validation).
/// Internal/leaf functions can continue using `anyhow::Result`; the `Internal` variant
/// allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("{service} unavailable: {message}")]
    Downstream { service: String, message: String },

    #[error("Pending item already queued for sender {sender_id}")]
    ConcurrencyViolation { sender_id: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RelayError {
    pub fn downstream(service: &str, message: impl Into<String>) -> Self {
        Self::Downstream {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Whether the inbound request should be acknowledged and dropped rather
    /// than surfaced to the caller. Upstream webhooks retry on non-2xx, so
    /// anything the sender cannot fix by resending is swallowed.
    pub fn is_discardable(&self) -> bool {
        match self {
            Self::MalformedEvent(_) | Self::Downstream { .. } => true,
            Self::Config(_) | Self::ConcurrencyViolation { .. } | Self::Internal(_) => false,
        }
    }
}

/// Convenience alias for results using `RelayError`.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests;
