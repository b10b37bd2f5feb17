//! Logging stage
//!
//! Logs request start and completion with latency. Failures are logged with
//! their kind and code; the server-side cause is included for kinds that hide
//! detail from the client.

use async_trait::async_trait;
use error_types::{ErrorKind, ServiceError};
use std::error::Error as _;
use std::time::Instant;

use crate::chain::{Middleware, Next, Outcome};
use crate::context::RequestContext;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogging;

#[async_trait]
impl Middleware for RequestLogging {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Outcome {
        let start = Instant::now();
        let operation = ctx.operation().to_string();

        tracing::info!(operation = %operation, "Request started");

        let outcome = next.run(ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(()) => {
                tracing::info!(operation = %operation, duration_ms, "Request completed");
            }
            Err(err) => log_failure(&operation, duration_ms, err),
        }

        outcome
    }
}

fn log_failure(operation: &str, duration_ms: u64, err: &ServiceError) {
    match err.kind() {
        ErrorKind::Unknown | ErrorKind::TokenIssuanceFailed => {
            let cause = err
                .source()
                .map(|c| c.to_string())
                .unwrap_or_else(|| err.message().to_string());
            tracing::error!(
                operation = %operation,
                duration_ms,
                kind = %err.kind(),
                code = err.code(),
                cause = %cause,
                "Request failed"
            );
        }
        _ => {
            tracing::warn!(
                operation = %operation,
                duration_ms,
                kind = %err.kind(),
                code = err.code(),
                error = %err,
                "Request rejected"
            );
        }
    }
}
