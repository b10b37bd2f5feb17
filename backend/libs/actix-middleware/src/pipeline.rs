//! Route registry and dispatch
//!
//! The [`Pipeline`] is built once at startup from the list of operations a
//! service exposes. For each operation it stores the ordered stages whose
//! selector matches, so no per-request matching beyond one map lookup takes
//! place. Operations not declared at build time get only the stages bound to
//! [`RouteSelector::All`].

use crypto_core::jwt::JwtCodec;
use error_types::ServiceError;
use message_validation::Validate;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::chain::{Endpoint, Middleware, Next, Outcome};
use crate::context::RequestContext;
use crate::jwt_auth::JwtAuth;
use crate::logging::RequestLogging;
use crate::recovery::Recovery;
use crate::request_span::RequestSpan;
use crate::selector::{normalize_operation, RouteSelector};

type Stages = Arc<[Arc<dyn Middleware>]>;

#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<(RouteSelector, Arc<dyn Middleware>)>,
}

impl PipelineBuilder {
    /// Append a stage. Stages run in the order they are added.
    pub fn stage<M>(mut self, selector: RouteSelector, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.stages.push((selector, Arc::new(middleware)));
        self
    }

    /// Resolve the stage list of every declared operation.
    pub fn build<I, S>(self, operations: I) -> Pipeline
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let select = |operation: Option<&str>| -> Stages {
            self.stages
                .iter()
                .filter(|(selector, _)| match operation {
                    Some(op) => selector.matches(op),
                    None => selector.is_universal(),
                })
                .map(|(_, stage)| Arc::clone(stage))
                .collect::<Vec<_>>()
                .into()
        };

        let routes = operations
            .into_iter()
            .map(|op| {
                let op = normalize_operation(op.as_ref());
                let stages = select(Some(&op));
                (op, stages)
            })
            .collect();

        Pipeline {
            routes,
            fallback: select(None),
        }
    }
}

/// Immutable operation-to-stages registry, shared via `Arc`.
pub struct Pipeline {
    routes: HashMap<String, Stages>,
    fallback: Stages,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (op, stages) in &self.routes {
            map.entry(op, &stages.iter().map(|s| s.name()).collect::<Vec<_>>());
        }
        map.finish()
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// recovery → tracing → logging on every operation, then bearer
    /// authentication on the `protected` ones.
    pub fn standard(codec: Arc<JwtCodec>, protected: RouteSelector) -> PipelineBuilder {
        Self::builder()
            .stage(RouteSelector::All, Recovery)
            .stage(RouteSelector::All, RequestSpan)
            .stage(RouteSelector::All, RequestLogging)
            .stage(protected, JwtAuth::new(codec))
    }

    /// Stages for an already normalized operation.
    pub fn stages_for(&self, operation: &str) -> &[Arc<dyn Middleware>] {
        self.routes.get(operation).unwrap_or(&self.fallback)
    }

    pub fn stage_names(&self, operation: &str) -> Vec<&'static str> {
        self.stages_for(&normalize_operation(operation))
            .iter()
            .map(|stage| stage.name())
            .collect()
    }

    /// Run the stages for `ctx.operation()` around `handler`.
    ///
    /// The chain is raced against the context's cancellation token and
    /// deadline. Errors leave with the request id attached as trace id.
    pub async fn dispatch<Req, Reply, H, Fut>(
        &self,
        ctx: RequestContext,
        req: Req,
        handler: H,
    ) -> Result<Reply, ServiceError>
    where
        Req: Send,
        Reply: Send,
        H: FnOnce(RequestContext, Req) -> Fut + Send,
        Fut: Future<Output = Result<Reply, ServiceError>> + Send,
    {
        let request_id = ctx.request_id().to_string();
        let cancellation = ctx.cancellation().clone();
        let deadline = ctx.deadline();

        let mut reply = None;
        let outcome = {
            let slot = &mut reply;
            let endpoint: Endpoint<'_> = Box::new(move |ctx| {
                Box::pin(async move {
                    *slot = Some(handler(ctx, req).await?);
                    Ok(())
                })
            });
            let stages = self.stages_for(ctx.operation());
            race(Next::new(stages, endpoint).run(ctx), &cancellation, deadline).await
        };

        let result = outcome.and_then(|()| {
            reply.ok_or_else(|| ServiceError::unknown("chain completed without a reply"))
        });

        result.map_err(|err| match err.trace_id() {
            Some(_) => err,
            None => err.with_trace_id(request_id),
        })
    }

    /// As [`dispatch`](Self::dispatch), with the request validated
    /// immediately before the handler runs.
    pub async fn dispatch_validated<Req, Reply, H, Fut>(
        &self,
        ctx: RequestContext,
        req: Req,
        handler: H,
    ) -> Result<Reply, ServiceError>
    where
        Req: Validate + Send,
        Reply: Send,
        H: FnOnce(RequestContext, Req) -> Fut + Send,
        Fut: Future<Output = Result<Reply, ServiceError>> + Send,
    {
        self.dispatch(ctx, req, |ctx, req| async move {
            req.validate()?;
            handler(ctx, req).await
        })
        .await
    }
}

async fn race(
    chain: futures::future::BoxFuture<'_, Outcome>,
    cancellation: &CancellationToken,
    deadline: Option<Instant>,
) -> Outcome {
    let expiry = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(ServiceError::cancelled()),
        _ = expiry => Err(ServiceError::deadline_exceeded()),
        outcome = chain => outcome,
    }
}
