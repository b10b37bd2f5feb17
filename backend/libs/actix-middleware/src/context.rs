//! Per-request context threaded through the admission chain
//!
//! A [`RequestContext`] is built by the transport adapter (HTTP or gRPC) and
//! handed to the first stage. Stages never mutate it in place: attaching the
//! verified identity produces a new context via
//! [`RequestContext::with_principal`], so a stage only ever observes the
//! identity established by the stages in front of it.

use chrono::{DateTime, TimeZone, Utc};
use crypto_core::jwt::Claims;
use error_types::ServiceError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::selector::normalize_operation;

/// Transport the request arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Http,
    Grpc,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http => f.write_str("http"),
            Transport::Grpc => f.write_str("grpc"),
        }
    }
}

/// Caller identity established by a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPrincipal {
    pub user_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RequestPrincipal {
    /// The subject must be a positive numeric user id.
    pub fn from_claims(claims: &Claims) -> Result<Self, ServiceError> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ServiceError::auth_invalid("token subject is not a user id"))?;

        let issued_at = Utc
            .timestamp_opt(claims.iat, 0)
            .single()
            .ok_or_else(|| ServiceError::auth_invalid("token iat out of range"))?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| ServiceError::auth_invalid("token exp out of range"))?;

        Ok(Self {
            user_id,
            issued_at,
            expires_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    operation: Arc<str>,
    transport: Transport,
    authorization: Option<Arc<str>>,
    request_id: Arc<str>,
    principal: Option<RequestPrincipal>,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// New context for `operation` with a generated request id, no deadline
    /// and a fresh cancellation token.
    pub fn new(operation: &str, transport: Transport) -> Self {
        Self {
            operation: Arc::from(normalize_operation(operation)),
            transport,
            authorization: None,
            request_id: Arc::from(Uuid::new_v4().to_string()),
            principal: None,
            deadline: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Raw authorization carrier value as received.
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(Arc::from(value.into()));
        self
    }

    /// Use the caller-supplied request id; blank values are ignored.
    pub fn with_request_id(mut self, request_id: &str) -> Self {
        let request_id = request_id.trim();
        if !request_id.is_empty() {
            self.request_id = Arc::from(request_id);
        }
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now, unless an earlier one is already set.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        match self.deadline {
            Some(existing) if existing <= candidate => self,
            _ => self.with_deadline(candidate),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Copy of this context carrying `principal`. `self` is left untouched.
    pub fn with_principal(&self, principal: RequestPrincipal) -> Self {
        Self {
            principal: Some(principal),
            ..self.clone()
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn principal(&self) -> Option<&RequestPrincipal> {
        self.principal.as_ref()
    }

    /// Principal for handlers behind the auth stage.
    pub fn require_principal(&self) -> Result<&RequestPrincipal, ServiceError> {
        self.principal
            .as_ref()
            .ok_or_else(|| ServiceError::auth_missing("authenticated identity required"))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// `Cancelled` or `DeadlineExceeded` once the request should stop.
    pub fn ensure_active(&self) -> Result<(), ServiceError> {
        if self.cancellation.is_cancelled() {
            return Err(ServiceError::cancelled());
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ServiceError::deadline_exceeded()),
            _ => Ok(()),
        }
    }
}
