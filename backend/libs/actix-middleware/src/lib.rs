//! # Actix Middleware Library
//!
//! Request admission for Casso services: the ordered chain every request
//! passes through before business logic runs.
//!
//! ## Modules
//! - `chain`: `Middleware` trait and the `Next` continuation
//! - `pipeline`: route registry built once at startup, plus dispatch
//! - `recovery`, `request_span`, `logging`, `jwt_auth`: the standard stages
//! - `context`: per-request context and verified principal
//! - `http`: actix-web adapter and request id middleware
//! - `telemetry`: tracing subscriber setup

pub mod chain;
pub mod context;
pub mod http;
pub mod jwt_auth;
pub mod logging;
pub mod pipeline;
pub mod recovery;
pub mod request_span;
pub mod selector;
pub mod telemetry;

pub use chain::{Middleware, Next, Outcome};
pub use context::{RequestContext, RequestPrincipal, Transport};
pub use http::{authorization_text, HttpAdmission, RequestIdMiddleware, REQUEST_ID_HEADER};
pub use jwt_auth::{extract_bearer, JwtAuth};
pub use logging::RequestLogging;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use recovery::Recovery;
pub use request_span::RequestSpan;
pub use selector::{normalize_operation, RouteSelector};
pub use telemetry::{init_tracing, LogFormat};
