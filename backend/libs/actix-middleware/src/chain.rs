//! Transport-agnostic middleware chain
//!
//! A stage receives the request context and a [`Next`] handle for the rest of
//! the chain. It may call [`Next::run`] and return the result unchanged,
//! transform it, or return early without delegating.
//!
//! ```ignore
//! struct Audit;
//!
//! #[async_trait]
//! impl Middleware for Audit {
//!     fn name(&self) -> &'static str {
//!         "audit"
//!     }
//!
//!     async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Outcome {
//!         tracing::info!(operation = %ctx.operation(), "audit");
//!         next.run(ctx).await
//!     }
//! }
//! ```

use async_trait::async_trait;
use error_types::ServiceError;
use futures::future::BoxFuture;
use std::sync::Arc;

use crate::context::RequestContext;

/// Result of running a chain. The typed reply travels outside the chain so
/// that stages stay independent of the request and reply types.
pub type Outcome = Result<(), ServiceError>;

pub(crate) type Endpoint<'a> =
    Box<dyn FnOnce(RequestContext) -> BoxFuture<'a, Outcome> + Send + 'a>;

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Outcome;
}

/// The remainder of the chain, ending at the handler.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    endpoint: Endpoint<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stages: &'a [Arc<dyn Middleware>], endpoint: Endpoint<'a>) -> Self {
        Self {
            rest: stages,
            endpoint,
        }
    }

    /// Delegate to the next stage, or to the handler after the last one.
    ///
    /// A cancelled or expired request stops here with `Cancelled` or
    /// `DeadlineExceeded`.
    pub fn run(self, ctx: RequestContext) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            ctx.ensure_active()?;
            match self.rest.split_first() {
                Some((stage, rest)) => {
                    let next = Next {
                        rest,
                        endpoint: self.endpoint,
                    };
                    stage.handle(ctx, next).await
                }
                None => (self.endpoint)(ctx).await,
            }
        })
    }

    /// Stages still ahead of the handler.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}
