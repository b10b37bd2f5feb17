//! Tracing stage: one span per request

use async_trait::async_trait;
use tracing::Instrument;

use crate::chain::{Middleware, Next, Outcome};
use crate::context::RequestContext;

/// Opens a `request` span carrying the operation, transport and request id.
/// The auth stage records `user_id` on it once the caller is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

#[async_trait]
impl Middleware for RequestSpan {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Outcome {
        let span = tracing::info_span!(
            "request",
            operation = %ctx.operation(),
            transport = %ctx.transport(),
            request_id = %ctx.request_id(),
            user_id = tracing::field::Empty,
        );

        next.run(ctx).instrument(span).await
    }
}
