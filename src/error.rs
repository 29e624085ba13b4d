type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Every attempt failed at the transport level, or the failure was not retryable.
    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        /// Physical attempts made before giving up.
        attempts: usize,
        #[source]
        source: TransportError,
    },
    /// Non-success HTTP status outside the retryable set.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Retry budget spent on rate-limit responses.
    #[error("rate limited with status {status} after {attempts} attempt(s): {body}")]
    RetriesExhausted {
        status: u16,
        attempts: usize,
        body: String,
    },
    /// A polled job reported `failed`.
    #[error("job failed: {body}")]
    JobFailed { body: serde_json::Value },
    /// A polled job did not reach a terminal state within the poll cap.
    #[error("job still pending after {polls} poll(s)")]
    PollTimeout { polls: usize },
    /// A header the protocol requires was absent from the response.
    #[error("missing response header '{0}'")]
    MissingHeader(String),
    /// A request body could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
    /// Invalid or missing client configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl ServiceError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::RetriesExhausted { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure to obtain any HTTP response at all.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    timeout: bool,
    retryable: bool,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    /// A retryable transport failure (connection reset, DNS, ...).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: false,
            retryable: true,
            source: None,
        }
    }

    /// A retryable failure caused by a request timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            timeout: true,
            ..Self::new(message)
        }
    }

    /// A failure that no amount of retrying will fix, such as a malformed URL.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            retryable: false,
            ..Self::new(message)
        }
    }

    /// Attaches the underlying error, reported through [`std::error::Error::source`].
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// True when the attempt hit the per-request timeout.
    pub fn is_timeout(&self) -> bool {
        self.timeout
    }

    /// Whether the dispatcher may spend another attempt on this failure.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            timeout: err.is_timeout(),
            retryable: !err.is_builder(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ServiceError, TransportError};

    #[test]
    fn invalid_request_is_not_retryable() {
        let err = TransportError::invalid_request("bad url");
        assert!(!err.is_retryable());
        assert!(!err.is_timeout());
        assert!(TransportError::timeout("slow").is_retryable());
    }

    #[test]
    fn status_is_exposed_for_http_failures() {
        let err = ServiceError::RetriesExhausted {
            status: 429,
            attempts: 5,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(ServiceError::Decode("x".to_owned()).status(), None);
    }
}
