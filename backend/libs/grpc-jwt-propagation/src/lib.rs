//! Bearer credential propagation for gRPC services
//!
//! ## Core Components
//!
//! - **GrpcAdmission**: runs tonic service methods through the shared
//!   admission pipeline, building the request context from metadata
//! - **request_context**: metadata (`authorization`, `x-request-id`,
//!   `grpc-timeout`) to [`RequestContext`](actix_middleware::RequestContext)
//! - **JwtClientInterceptor**: injects the bearer token into outgoing calls
//!
//! Auth failures leave as `Status::unauthenticated`, validation failures as
//! `Status::invalid_argument`; see `error_types` for the full mapping.

mod client;
mod server;

pub use client::{InterceptorError, JwtClientInterceptor};
pub use server::{
    parse_grpc_timeout, request_context, GrpcAdmission, AUTHORIZATION_KEY, GRPC_TIMEOUT_KEY,
    REQUEST_ID_KEY,
};

// Re-export tonic Status for convenience
pub use tonic::Status;
