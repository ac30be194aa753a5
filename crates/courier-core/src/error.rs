use thiserror::Error;

/// Top-level error type for Courier.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Connection, timeout, or DNS failure talking to the Bot API. Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The Bot API answered with a structured failure.
    #[error("api error {code}: {description}")]
    Api {
        code: i64,
        description: String,
        /// Seconds to wait before retrying (rate limiting).
        retry_after: Option<u64>,
        /// The group was upgraded to a supergroup with this id.
        migrate_to_chat_id: Option<i64>,
    },

    /// A local file or remote file reference could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Offset store error.
    #[error("store error: {0}")]
    Store(String),

    /// A runtime task failed (panicked or was aborted).
    #[error("runtime error: {0}")]
    Runtime(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CourierError {
    /// Shorthand for an API error without response parameters.
    pub fn api(code: i64, description: impl Into<String>) -> Self {
        Self::Api {
            code,
            description: description.into(),
            retry_after: None,
            migrate_to_chat_id: None,
        }
    }

    /// Whether retrying the same request later may succeed.
    ///
    /// Network failures and 5xx answers are transient; other API errors
    /// (bad request, unauthorized, conflict) are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// Rate-limit hint in seconds, if the API sent one.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = CourierError::api(401, "Unauthorized");
        assert_eq!(err.to_string(), "api error 401: Unauthorized");
    }

    #[test]
    fn test_transient_classification() {
        assert!(CourierError::Network("connection refused".into()).is_transient());
        assert!(CourierError::api(502, "Bad Gateway").is_transient());
        assert!(!CourierError::api(409, "Conflict").is_transient());
        assert!(!CourierError::NotFound("x".into()).is_transient());
    }

    #[test]
    fn test_retry_after_only_on_api() {
        let limited = CourierError::Api {
            code: 429,
            description: "Too Many Requests: retry after 7".into(),
            retry_after: Some(7),
            migrate_to_chat_id: None,
        };
        assert_eq!(limited.retry_after(), Some(7));
        assert!(!limited.is_transient());
        assert_eq!(CourierError::Network("timeout".into()).retry_after(), None);
    }
}
