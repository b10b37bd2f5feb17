//! Panic recovery stage
//!
//! Outermost stage of every chain. A panic anywhere behind it, including in
//! the handler, is turned into an `Unknown` error for this request only.

use async_trait::async_trait;
use error_types::ServiceError;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::chain::{Middleware, Next, Outcome};
use crate::context::RequestContext;

#[derive(Debug, Clone, Copy, Default)]
pub struct Recovery;

#[async_trait]
impl Middleware for Recovery {
    fn name(&self) -> &'static str {
        "recovery"
    }

    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Outcome {
        let operation = ctx.operation().to_string();
        let request_id = ctx.request_id().to_string();

        match AssertUnwindSafe(next.run(ctx)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                tracing::error!(
                    operation = %operation,
                    request_id = %request_id,
                    panic = %detail,
                    "Recovered from panic in request chain"
                );
                Err(ServiceError::unknown(format!("panic: {detail}")))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let literal: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(literal.as_ref()), "boom");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(owned.as_ref()), "owned boom");

        let other: Box<dyn Any + Send> = Box::new(17u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
