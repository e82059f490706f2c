use thiserror::Error;

/// Centralized error type for backend fetch failures.
///
/// `Clone` is load-bearing: a failed block keeps its error as terminal
/// state and the stream re-reports it on every subsequent read.
#[derive(Debug, Error, Clone)]
pub enum BackendError {
    #[error("HTTP {status} {reason} for {url}")]
    HttpStatus {
        status: u16,
        reason: String,
        url: String,
    },

    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error {code}: {message}")]
    Server { code: i32, message: String },
}

impl BackendError {
    /// Creates an HTTP status error with the server's reason phrase.
    pub fn http_status(status: u16, reason: impl Into<String>, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            reason: reason.into(),
            url: url.into(),
        }
    }

    /// Creates a protocol error from a generic message.
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::Protocol(msg.into())
    }

    /// Gets the HTTP status code if this is an HTTP status error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BackendError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.to_string())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
