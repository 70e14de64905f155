use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single gateway call.
///
/// The variants follow the retry classification: 4xx responses are
/// [`Rejected`](ClientError::Rejected) and never retried, everything else
/// that went over the wire may succeed on a later attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("request rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("server error ({status}): {message}")]
    Server { status: StatusCode, message: String },
    /// Connectivity failure or timeout. Reported with status 0.
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response body ({status}): {message}")]
    Decode { status: StatusCode, message: String },
    /// Refused before any I/O because the payload breaks a record invariant.
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl ClientError {
    /// Builds the error for a non-2xx response.
    pub(crate) fn from_status(status: StatusCode, message: String) -> Self {
        if status.is_client_error() {
            Self::Rejected { status, message }
        } else {
            Self::Server { status, message }
        }
    }

    /// HTTP status carried by the error, `0` for network-level failures.
    pub fn status(&self) -> u16 {
        match self {
            Self::Rejected { status, .. }
            | Self::Server { status, .. }
            | Self::Decode { status, .. } => status.as_u16(),
            Self::Network(_) => 0,
            Self::Invalid(_) => StatusCode::BAD_REQUEST.as_u16(),
        }
    }

    /// Client errors (`400..500`) will not succeed on retry.
    pub fn is_retryable(&self) -> bool {
        !(400..500).contains(&self.status())
    }

    /// Human readable message without the status prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected { message, .. }
            | Self::Server { message, .. }
            | Self::Decode { message, .. } => message,
            Self::Network(message) | Self::Invalid(message) => message,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Network(format!("request timed out: {err}"));
        }
        Self::Network(err.to_string())
    }
}

/// A gateway call that gave up, either on a non-retryable error or after the
/// retry budget ran out. The inner error keeps its kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct RequestFailed {
    pub attempts: u32,
    pub error: ClientError,
}

impl RequestFailed {
    /// Failure raised before the request was ever sent.
    pub(crate) fn local(error: ClientError) -> Self {
        Self { attempts: 0, error }
    }

    pub fn status(&self) -> u16 {
        self.error.status()
    }
}
