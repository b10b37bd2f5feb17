//! actix-web adapter
//!
//! [`HttpAdmission`] turns an `HttpRequest` into a [`RequestContext`] and runs
//! it through the shared [`Pipeline`]. [`RequestIdMiddleware`] makes sure every
//! request carries an `x-request-id` and echoes it on the response.
//!
//! ## Example
//! ```ignore
//! let admission = web::Data::new(HttpAdmission::new(pipeline, timeout));
//!
//! App::new()
//!     .app_data(admission.clone())
//!     .wrap(RequestIdMiddleware)
//!     .route("/v1/shop/user", web::get().to(get_user));
//! ```

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue, AUTHORIZATION},
    web::Bytes,
    Error, HttpMessage, HttpRequest,
};
use error_types::ServiceError;
use futures::future::LocalBoxFuture;
use message_validation::Validate;
use serde::de::DeserializeOwned;
use std::future::{ready, Future, Ready};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::context::{RequestContext, Transport};
use crate::pipeline::Pipeline;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id assigned by [`RequestIdMiddleware`], stored in request
/// extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Pipeline plus transport defaults for HTTP handlers
#[derive(Debug, Clone)]
pub struct HttpAdmission {
    pipeline: Arc<Pipeline>,
    request_timeout: Option<Duration>,
}

impl HttpAdmission {
    pub fn new(pipeline: Arc<Pipeline>, request_timeout: Option<Duration>) -> Self {
        Self {
            pipeline,
            request_timeout,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Context for `operation` from the request headers.
    pub fn context(&self, req: &HttpRequest, operation: &str) -> RequestContext {
        let mut ctx = RequestContext::new(operation, Transport::Http);

        if let Some(request_id) = request_id_of(req) {
            ctx = ctx.with_request_id(&request_id);
        }
        if let Some(value) = req.headers().get(AUTHORIZATION) {
            ctx = ctx.with_authorization(authorization_text(value.as_bytes()));
        }
        if let Some(timeout) = self.request_timeout {
            ctx = ctx.with_timeout(timeout);
        }

        ctx
    }

    pub async fn dispatch<Req, Reply, H, Fut>(
        &self,
        req: &HttpRequest,
        operation: &str,
        body: Req,
        handler: H,
    ) -> Result<Reply, ServiceError>
    where
        Req: Send,
        Reply: Send,
        H: FnOnce(RequestContext, Req) -> Fut + Send,
        Fut: Future<Output = Result<Reply, ServiceError>> + Send,
    {
        let ctx = self.context(req, operation);
        self.pipeline.dispatch(ctx, body, handler).await
    }

    pub async fn dispatch_validated<Req, Reply, H, Fut>(
        &self,
        req: &HttpRequest,
        operation: &str,
        body: Req,
        handler: H,
    ) -> Result<Reply, ServiceError>
    where
        Req: Validate + Send,
        Reply: Send,
        H: FnOnce(RequestContext, Req) -> Fut + Send,
        Fut: Future<Output = Result<Reply, ServiceError>> + Send,
    {
        let ctx = self.context(req, operation);
        self.pipeline.dispatch_validated(ctx, body, handler).await
    }

    /// As [`dispatch_validated`](Self::dispatch_validated) for a raw JSON
    /// body. Decoding happens inside the chain, so a malformed body is
    /// logged and answered like any other failure.
    pub async fn dispatch_json<Req, Reply, H, Fut>(
        &self,
        req: &HttpRequest,
        operation: &str,
        body: Bytes,
        handler: H,
    ) -> Result<Reply, ServiceError>
    where
        Req: DeserializeOwned + Validate + Send,
        Reply: Send,
        H: FnOnce(RequestContext, Req) -> Fut + Send,
        Fut: Future<Output = Result<Reply, ServiceError>> + Send,
    {
        let ctx = self.context(req, operation);
        self.pipeline
            .dispatch(ctx, body, |ctx, body| async move {
                let req: Req = serde_json::from_slice(&body).map_err(|e| {
                    ServiceError::invalid_params(format!("malformed request body: {e}"))
                })?;
                req.validate()?;
                handler(ctx, req).await
            })
            .await
    }
}

/// Authorization header bytes as text. Bytes outside visible ASCII are
/// replaced rather than dropped, so a present but undecodable value still
/// reaches token verification.
pub fn authorization_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn request_id_of(req: &HttpRequest) -> Option<String> {
    if let Some(RequestId(id)) = req.extensions().get::<RequestId>() {
        return Some(id.clone());
    }
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Middleware that assigns and echoes `x-request-id`
///
/// - If the request has an `x-request-id` header: use it
/// - Otherwise: generate a UUID v4
#[derive(Clone, Default)]
pub struct RequestIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdMiddlewareService { service }))
    }
}

pub struct RequestIdMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestIdMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        req.extensions_mut().insert(RequestId(request_id.clone()));

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            Ok(res)
        })
    }
}
