//! Unified error vocabulary for Casso services
//!
//! Every failure that can leave the request-admission layer is a
//! [`ServiceError`] tagged with an [`ErrorKind`]. The kind alone decides the
//! external status (HTTP status code or gRPC code); the optional wrapped cause
//! is for server-side logs only and never reaches the client.
//!
//! ```ignore
//! match repo.get(id).await {
//!     Ok(user) => Ok(user),
//!     Err(e) => Err(ServiceError::internal(e)),
//! }
//! ```

mod validation;

pub use validation::ValidationError;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias for Casso services
pub type Result<T> = std::result::Result<T, ServiceError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of every admission and service failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No credential on a protected route
    AuthMissing,
    /// Signature or format failure
    AuthInvalid,
    /// Credential past its expiry
    AuthExpired,
    /// A declared field rule failed
    ValidationFailed,
    /// Handler precondition failed before reaching the repository
    InvalidParams,
    /// Lookup found nothing
    NotFound,
    /// Anything unexpected, including storage failures and panics
    Unknown,
    /// Signing a new token failed (key misconfiguration)
    TokenIssuanceFailed,
    /// The caller went away
    Cancelled,
    /// The request deadline elapsed
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorKind::AuthMissing | ErrorKind::AuthInvalid | ErrorKind::AuthExpired => {
                StatusCode::UNAUTHORIZED
            }
            ErrorKind::ValidationFailed | ErrorKind::InvalidParams => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unknown | ErrorKind::TokenIssuanceFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // 499 is the de-facto "client closed request" status
            ErrorKind::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT)
            }
            ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn grpc_code(self) -> tonic::Code {
        match self {
            ErrorKind::AuthMissing | ErrorKind::AuthInvalid | ErrorKind::AuthExpired => {
                tonic::Code::Unauthenticated
            }
            ErrorKind::ValidationFailed | ErrorKind::InvalidParams => tonic::Code::InvalidArgument,
            ErrorKind::NotFound => tonic::Code::NotFound,
            ErrorKind::Unknown => tonic::Code::Unknown,
            ErrorKind::TokenIssuanceFailed => tonic::Code::Internal,
            ErrorKind::Cancelled => tonic::Code::Cancelled,
            ErrorKind::DeadlineExceeded => tonic::Code::DeadlineExceeded,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::AuthMissing => error_codes::TOKEN_MISSING,
            ErrorKind::AuthInvalid => error_codes::TOKEN_INVALID,
            ErrorKind::AuthExpired => error_codes::TOKEN_EXPIRED,
            ErrorKind::ValidationFailed => error_codes::VALIDATION_FAILED,
            ErrorKind::InvalidParams => error_codes::INVALID_PARAMS,
            ErrorKind::NotFound => error_codes::RECORD_NOT_FOUND,
            ErrorKind::Unknown => error_codes::UNKNOWN_ERROR,
            ErrorKind::TokenIssuanceFailed => error_codes::TOKEN_ISSUANCE_FAILED,
            ErrorKind::Cancelled => error_codes::REQUEST_CANCELLED,
            ErrorKind::DeadlineExceeded => error_codes::DEADLINE_EXCEEDED,
        }
    }

    pub fn error_type(self) -> &'static str {
        match self {
            ErrorKind::AuthMissing | ErrorKind::AuthInvalid | ErrorKind::AuthExpired => {
                error_types::AUTHENTICATION_ERROR
            }
            ErrorKind::ValidationFailed | ErrorKind::InvalidParams => error_types::VALIDATION_ERROR,
            ErrorKind::NotFound => error_types::NOT_FOUND_ERROR,
            ErrorKind::Unknown | ErrorKind::TokenIssuanceFailed => error_types::SERVER_ERROR,
            ErrorKind::Cancelled | ErrorKind::DeadlineExceeded => error_types::TIMEOUT_ERROR,
        }
    }

    /// Whether the message handed to the client must be replaced by a
    /// generic one.
    fn hides_detail(self) -> bool {
        matches!(self, ErrorKind::Unknown | ErrorKind::TokenIssuanceFailed)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The error every admission stage and business handler returns
#[derive(Debug)]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    violation: Option<ValidationError>,
    source: Option<BoxError>,
    trace_id: Option<String>,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            violation: None,
            source: None,
            trace_id: None,
        }
    }

    pub fn auth_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthMissing, message)
    }

    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthInvalid, message)
    }

    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthExpired, message)
    }

    pub fn validation(violation: ValidationError) -> Self {
        Self {
            kind: ErrorKind::ValidationFailed,
            message: violation.to_string(),
            violation: Some(violation),
            source: None,
            trace_id: None,
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn token_issuance(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenIssuanceFailed, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request cancelled")
    }

    pub fn deadline_exceeded() -> Self {
        Self::new(ErrorKind::DeadlineExceeded, "request deadline exceeded")
    }

    /// Downgrade an unclassified failure (storage driver, I/O, ...) to
    /// `Unknown`, keeping the original only as the server-side cause.
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::unknown(err.to_string()).with_source(err)
    }

    pub fn with_source<E>(mut self, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(err));
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Server-side message; may contain internal detail.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message safe to return to a client.
    pub fn public_message(&self) -> String {
        match self.kind {
            ErrorKind::Unknown => "internal error".to_string(),
            ErrorKind::TokenIssuanceFailed => "failed to issue token".to_string(),
            _ => self.message.clone(),
        }
    }

    /// Failing field rule, for `ValidationFailed`.
    pub fn violation(&self) -> Option<&ValidationError> {
        self.violation.as_ref()
    }

    /// Top-level failing field, for `ValidationFailed`.
    pub fn field(&self) -> Option<&str> {
        self.violation.as_ref().map(ValidationError::field)
    }

    pub fn reason(&self) -> Option<&str> {
        self.violation.as_ref().map(ValidationError::reason)
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn to_response(&self) -> ErrorResponse {
        let mut response = ErrorResponse::new(
            self.kind.http_status().as_u16(),
            self.kind.code(),
            self.kind.error_type(),
            &self.public_message(),
        );
        if !self.kind.hides_detail() {
            response.field = self.violation.as_ref().map(ValidationError::field_path);
        }
        response.trace_id = self.trace_id.clone();
        response
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Some(violation) = &self.violation {
            return Some(violation);
        }
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<ValidationError> for ServiceError {
    fn from(violation: ValidationError) -> Self {
        ServiceError::validation(violation)
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        self.kind.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_response())
    }
}

impl From<ServiceError> for tonic::Status {
    fn from(err: ServiceError) -> Self {
        let mut status = tonic::Status::new(err.kind.grpc_code(), err.public_message());
        status.metadata_mut().insert(
            "x-error-code",
            tonic::metadata::MetadataValue::from_static(err.kind.code()),
        );
        if let Some(trace_id) = err.trace_id.as_deref().and_then(|t| t.parse().ok()) {
            status.metadata_mut().insert("x-request-id", trace_id);
        }
        status
    }
}

/// Error body returned by every HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status code
    pub status: u16,

    /// Stable machine-readable code, e.g. `TOKEN_MISSING`
    pub code: String,

    /// Error family used by clients for routing
    pub error_type: String,

    /// Client-safe message
    pub message: String,

    /// Dotted path of the failing field, for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Request id for log correlation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(status: u16, code: &str, error_type: &str, message: &str) -> Self {
        Self {
            status,
            code: code.to_string(),
            error_type: error_type.to_string(),
            message: message.to_string(),
            field: None,
            trace_id: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Stable error codes
pub mod error_codes {
    pub const TOKEN_MISSING: &str = "TOKEN_MISSING";
    pub const TOKEN_INVALID: &str = "TOKEN_INVALID";
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    pub const TOKEN_ISSUANCE_FAILED: &str = "TOKEN_ISSUANCE_FAILED";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
    pub const RECORD_NOT_FOUND: &str = "RECORD_NOT_FOUND";
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
    pub const REQUEST_CANCELLED: &str = "REQUEST_CANCELLED";
    pub const DEADLINE_EXCEEDED: &str = "DEADLINE_EXCEEDED";
}

/// Error families
pub mod error_types {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const AUTHENTICATION_ERROR: &str = "authentication_error";
    pub const NOT_FOUND_ERROR: &str = "not_found_error";
    pub const SERVER_ERROR: &str = "server_error";
    pub const TIMEOUT_ERROR: &str = "timeout_error";
}
