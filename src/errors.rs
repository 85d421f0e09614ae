use axum::http::StatusCode;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Failure to fetch the subject list from the backend.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("sensor request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend answered {0}")]
    Status(reqwest::StatusCode),

    /// The backend redirects requests without a valid session to its login page.
    #[error("backend rejected the session")]
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to connect push channel: {0}")]
    Connect(String),

    #[error("push channel transport error: {0}")]
    Transport(String),

    #[error("push channel closed")]
    Closed,

    #[error("malformed channel payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleError {
    #[error("sample has no timestamp")]
    MissingTimestamp,

    #[error("unrecognised timestamp {0:?}")]
    BadTimestamp(String),

    #[error("sample has no value")]
    MissingValue,

    #[error("sample value is not a finite number")]
    BadValue,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}
