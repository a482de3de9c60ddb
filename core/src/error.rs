//! Error types for the BTCPay client and the status-to-error mapping.
//!
//! # Design
//! The transport only ever fails with `ConnectError`: no response was
//! obtained at all. Anything that came back over the wire, whatever its
//! status, is a `Response`, and `map_error` turns a non-2xx one into exactly
//! one `ApiError`. `classify` picks the bucket and `map_error` builds the
//! variant with an exhaustive match on `ErrorKind`, so adding a bucket fails
//! to compile until it is mapped.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::http::HttpMethod;
use crate::response::Response;

/// Numeric codes carried by `ConnectError`. Values follow libcurl's
/// `CURLcode` numbering so callers porting from curl-based clients can keep
/// their existing checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ConnectErrorCode {
    UnsupportedProtocol = 1,
    MalformedUrl = 3,
    CouldNotResolveHost = 6,
    CouldNotConnect = 7,
    InvalidReply = 8,
    TimedOut = 28,
    TlsHandshake = 35,
    BadArgument = 43,
    SendFailed = 55,
    ReceiveFailed = 56,
}

impl ConnectErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// The transfer failed before any response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {})", .code.as_i32())]
pub struct ConnectError {
    pub message: String,
    pub code: ConnectErrorCode,
}

impl ConnectError {
    pub fn new(code: ConnectErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// The numeric error code.
    pub fn code(&self) -> i32 {
        self.code.as_i32()
    }
}

/// Context shared by every error raised for a received non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub method: HttpMethod,
    pub url: String,
    pub status: u16,
    pub body: String,
    pub message: String,
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} returned {}: {}",
            self.method, self.url, self.status, self.message
        )
    }
}

/// One entry of a Greenfield validation error body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub message: String,
}

/// Bucket a non-2xx status falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    NotFound,
    Conflict,
    Server,
    Generic,
}

/// Errors returned by `ApiClient` and the endpoint groups built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was obtained.
    #[error("connection failed: {0}")]
    Connect(#[from] ConnectError),

    /// 400. `errors` holds the field-level details when the body has them.
    #[error("validation failed: {failure}")]
    Validation {
        failure: RequestFailure,
        errors: Vec<FieldError>,
    },

    /// 401 or 403.
    #[error("authentication failed: {0}")]
    Authentication(RequestFailure),

    /// 404.
    #[error("not found: {0}")]
    NotFound(RequestFailure),

    /// 409.
    #[error("conflict: {0}")]
    Conflict(RequestFailure),

    /// 500..=599.
    #[error("server error: {0}")]
    Server(RequestFailure),

    /// Any other non-2xx status.
    #[error("request failed: {0}")]
    Generic(RequestFailure),

    /// A value was rejected at the point of assignment.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// The HTTP bucket, for errors raised from a received response.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiError::Validation { .. } => Some(ErrorKind::Validation),
            ApiError::Authentication(_) => Some(ErrorKind::Authentication),
            ApiError::NotFound(_) => Some(ErrorKind::NotFound),
            ApiError::Conflict(_) => Some(ErrorKind::Conflict),
            ApiError::Server(_) => Some(ErrorKind::Server),
            ApiError::Generic(_) => Some(ErrorKind::Generic),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&RequestFailure> {
        match self {
            ApiError::Validation { failure, .. }
            | ApiError::Authentication(failure)
            | ApiError::NotFound(failure)
            | ApiError::Conflict(failure)
            | ApiError::Server(failure)
            | ApiError::Generic(failure) => Some(failure),
            _ => None,
        }
    }

    /// HTTP status, absent for connect-level and local errors.
    pub fn status(&self) -> Option<u16> {
        self.failure().map(|f| f.status)
    }
}

/// Pick the error bucket for a status. Checked in priority order; total over
/// every `u16`, so nothing falls through.
pub fn classify(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::Validation,
        401 | 403 => ErrorKind::Authentication,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::Conflict,
        500..=599 => ErrorKind::Server,
        _ => ErrorKind::Generic,
    }
}

/// Convert a failed response into its typed error.
pub fn map_error(method: HttpMethod, url: &str, response: &Response) -> ApiError {
    let status = response.status();
    let body = response.body();
    let kind = classify(status);
    let errors = if kind == ErrorKind::Validation {
        field_errors(body)
    } else {
        Vec::new()
    };

    let failure = RequestFailure {
        method,
        url: url.to_string(),
        status,
        body: body.to_string(),
        message: failure_message(status, body, &errors),
    };

    match kind {
        ErrorKind::Validation => ApiError::Validation { failure, errors },
        ErrorKind::Authentication => ApiError::Authentication(failure),
        ErrorKind::NotFound => ApiError::NotFound(failure),
        ErrorKind::Conflict => ApiError::Conflict(failure),
        ErrorKind::Server => ApiError::Server(failure),
        ErrorKind::Generic => ApiError::Generic(failure),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn field_errors(body: &str) -> Vec<FieldError> {
    serde_json::from_str(body).unwrap_or_default()
}

fn failure_message(status: u16, body: &str, errors: &[FieldError]) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    if let Some(first) = errors.first() {
        return if first.path.is_empty() {
            first.message.clone()
        } else {
            format!("{}: {}", first.path, first.message)
        };
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_string()
    }
}
