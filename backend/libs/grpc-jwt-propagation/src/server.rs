//! Server-side context adapter
//!
//! Builds a [`RequestContext`] from incoming gRPC metadata and runs tonic
//! service methods through the shared admission [`Pipeline`].
//!
//! Metadata read:
//! - `authorization`: bearer credential, passed raw to the auth stage
//! - `x-request-id`: correlation id, generated when absent
//! - `grpc-timeout`: caller deadline, overrides the service default when shorter

use actix_middleware::{authorization_text, Pipeline, RequestContext, Transport};
use error_types::ServiceError;
use message_validation::Validate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};

pub const AUTHORIZATION_KEY: &str = "authorization";
pub const REQUEST_ID_KEY: &str = "x-request-id";
pub const GRPC_TIMEOUT_KEY: &str = "grpc-timeout";

/// Context for `operation` from request metadata.
pub fn request_context(
    metadata: &MetadataMap,
    operation: &str,
    default_timeout: Option<Duration>,
) -> RequestContext {
    let mut ctx = RequestContext::new(operation, Transport::Grpc);

    if let Some(request_id) = ascii_value(metadata, REQUEST_ID_KEY) {
        ctx = ctx.with_request_id(request_id);
    }
    if let Some(value) = metadata.get(AUTHORIZATION_KEY) {
        if value.to_str().is_err() {
            tracing::warn!(
                operation = %ctx.operation(),
                "Authorization metadata is not visible ASCII"
            );
        }
        ctx = ctx.with_authorization(authorization_text(value.as_encoded_bytes()));
    }

    let caller_timeout = ascii_value(metadata, GRPC_TIMEOUT_KEY).and_then(parse_grpc_timeout);
    for timeout in [caller_timeout, default_timeout].into_iter().flatten() {
        ctx = ctx.with_timeout(timeout);
    }

    ctx
}

fn ascii_value<'a>(metadata: &'a MetadataMap, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(|v| v.to_str().ok())
}

/// Parse a `grpc-timeout` value: up to eight digits followed by a unit
/// (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let value = value.trim();
    let unit = value.chars().last()?;
    let digits = &value[..value.len() - unit.len_utf8()];

    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let timeout = match unit {
        'H' => Duration::from_secs(amount * 3600),
        'M' => Duration::from_secs(amount * 60),
        'S' => Duration::from_secs(amount),
        'm' => Duration::from_millis(amount),
        'u' => Duration::from_micros(amount),
        'n' => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}

/// Pipeline plus transport defaults for tonic service implementations
///
/// ```ignore
/// async fn get_user(&self, request: Request<GetUserRequest>) -> Result<Response<UserInfo>, Status> {
///     self.admission
///         .dispatch(request, "/api.user.service.v1.User/GetUser", |ctx, req| {
///             self.service.get_user(ctx, req)
///         })
///         .await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GrpcAdmission {
    pipeline: Arc<Pipeline>,
    request_timeout: Option<Duration>,
}

impl GrpcAdmission {
    pub fn new(pipeline: Arc<Pipeline>, request_timeout: Option<Duration>) -> Self {
        Self {
            pipeline,
            request_timeout,
        }
    }

    pub fn context<T>(&self, request: &Request<T>, operation: &str) -> RequestContext {
        request_context(request.metadata(), operation, self.request_timeout)
    }

    /// Run the chain for `operation`; the reply or error leaves as a tonic
    /// response or status.
    pub async fn dispatch<Req, Reply, H, Fut>(
        &self,
        request: Request<Req>,
        operation: &str,
        handler: H,
    ) -> Result<Response<Reply>, Status>
    where
        Req: Send,
        Reply: Send,
        H: FnOnce(RequestContext, Req) -> Fut + Send,
        Fut: Future<Output = Result<Reply, ServiceError>> + Send,
    {
        let ctx = self.context(&request, operation);
        self.pipeline
            .dispatch(ctx, request.into_inner(), handler)
            .await
            .map(Response::new)
            .map_err(Status::from)
    }

    /// As [`dispatch`](Self::dispatch), validating the message first.
    pub async fn dispatch_validated<Req, Reply, H, Fut>(
        &self,
        request: Request<Req>,
        operation: &str,
        handler: H,
    ) -> Result<Response<Reply>, Status>
    where
        Req: Validate + Send,
        Reply: Send,
        H: FnOnce(RequestContext, Req) -> Fut + Send,
        Fut: Future<Output = Result<Reply, ServiceError>> + Send,
    {
        let ctx = self.context(&request, operation);
        self.pipeline
            .dispatch_validated(ctx, request.into_inner(), handler)
            .await
            .map(Response::new)
            .map_err(Status::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::metadata::MetadataValue;

    #[test]
    fn test_parse_grpc_timeout_units() {
        assert_eq!(parse_grpc_timeout("1H"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_grpc_timeout("2M"), Some(Duration::from_secs(120)));
        assert_eq!(parse_grpc_timeout("3S"), Some(Duration::from_secs(3)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("10u"), Some(Duration::from_micros(10)));
        assert_eq!(parse_grpc_timeout("99999999n"), Some(Duration::from_nanos(99_999_999)));
    }

    #[test]
    fn test_parse_grpc_timeout_rejects_malformed() {
        for value in ["", "S", "100", "123456789S", "1.5S", "-1S", "10x", "1令"] {
            assert_eq!(parse_grpc_timeout(value), None, "value {value:?}");
        }
    }

    #[tokio::test]
    async fn test_request_context_reads_metadata() {
        let mut metadata = MetadataMap::new();
        metadata.insert(AUTHORIZATION_KEY, MetadataValue::from_static("Bearer abc"));
        metadata.insert(REQUEST_ID_KEY, MetadataValue::from_static("req-9"));

        let ctx = request_context(&metadata, "api.user.service.v1.User/GetUser", None);

        assert_eq!(ctx.operation(), "/api.user.service.v1.User/GetUser");
        assert_eq!(ctx.transport(), Transport::Grpc);
        assert_eq!(ctx.authorization(), Some("Bearer abc"));
        assert_eq!(ctx.request_id(), "req-9");
        assert!(ctx.deadline().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_authorization_is_kept() {
        use tonic::codegen::http::{HeaderMap, HeaderValue};

        let mut headers = HeaderMap::new();
        let raw = HeaderValue::from_bytes(b"Bearer \xe4\xbb\xa4\xe7\x89\x8c").unwrap();
        headers.insert(AUTHORIZATION_KEY, raw);
        let metadata = MetadataMap::from_headers(headers);

        let ctx = request_context(&metadata, "/a.B/C", None);

        assert_eq!(ctx.authorization(), Some("Bearer 令牌"));
    }

    #[tokio::test]
    async fn test_caller_timeout_wins_when_shorter() {
        let mut metadata = MetadataMap::new();
        metadata.insert(GRPC_TIMEOUT_KEY, MetadataValue::from_static("50m"));

        let start = tokio::time::Instant::now();
        let ctx = request_context(&metadata, "/a.B/C", Some(Duration::from_secs(30)));
        let deadline = ctx.deadline().unwrap();

        assert!(deadline <= start + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_default_timeout_applies_without_caller_deadline() {
        let start = tokio::time::Instant::now();
        let ctx = request_context(&MetadataMap::new(), "/a.B/C", Some(Duration::from_secs(30)));
        let deadline = ctx.deadline().unwrap();

        assert!(deadline >= start + Duration::from_secs(29));
    }
}
