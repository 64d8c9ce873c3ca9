use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Uniform failure for every API call: transport problems, timeouts and
/// non-2xx responses all land here.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No token received")]
    MissingToken,
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error bodies from the API look like `{"success":false,"message":"..."}`
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Message for a failed response: the body's `message` field, the raw
    /// body, or the status reason, in that order.
    fn response_message(status: StatusCode, body: &str) -> String {
        if let Ok(ErrorBody { message: Some(message) }) = serde_json::from_str::<ErrorBody>(body) {
            if !message.trim().is_empty() {
                return message;
            }
        }
        let body = body.trim();
        if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string()
        } else {
            Self::truncate_body(body)
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = Self::response_message(status, body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            code @ 500..=599 => ApiError::ServerError { status: code, message },
            code => ApiError::Rejected { status: code, message },
        }
    }

    /// Classify a reqwest failure that happened before a status was seen
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err)
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            ApiError::InvalidRequest(err.to_string())
        } else {
            ApiError::NetworkError(err)
        }
    }

    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited => Some(429),
            ApiError::ServerError { status, .. } | ApiError::Rejected { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::AccessDenied(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::RateLimited => "rate_limited",
            ApiError::ServerError { .. } => "server_error",
            ApiError::Rejected { .. } => "rejected",
            ApiError::Timeout(_) => "timeout",
            ApiError::NetworkError(_) => "network_error",
            ApiError::InvalidResponse(_) => "invalid_response",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::MissingToken => "missing_token",
        }
    }

    /// Message the server sent back with a failed response
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(m)
            | ApiError::AccessDenied(m)
            | ApiError::NotFound(m)
            | ApiError::ServerError { message: m, .. }
            | ApiError::Rejected { message: m, .. } => Some(m.as_str()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::NetworkError(_))
    }
}
