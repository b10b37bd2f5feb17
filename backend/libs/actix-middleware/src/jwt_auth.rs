use async_trait::async_trait;
use crypto_core::jwt::JwtCodec;
use error_types::ServiceError;
use std::sync::Arc;

use crate::chain::{Middleware, Next, Outcome};
use crate::context::{RequestContext, RequestPrincipal};

/// Bearer token authentication stage
///
/// Verifies the authorization carrier before anything behind it runs and
/// hands a context carrying the [`RequestPrincipal`] to the rest of the chain.
pub struct JwtAuth {
    codec: Arc<JwtCodec>,
}

impl JwtAuth {
    pub fn new(codec: Arc<JwtCodec>) -> Self {
        Self { codec }
    }
}

#[async_trait]
impl Middleware for JwtAuth {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Outcome {
        let token = extract_bearer(ctx.authorization()).ok_or_else(|| {
            tracing::warn!(operation = %ctx.operation(), "Missing authorization");
            ServiceError::auth_missing("authorization is required")
        })?;

        let claims = self.codec.verify(token).map_err(|e| {
            tracing::warn!(operation = %ctx.operation(), "JWT validation failed: {}", e);
            ServiceError::from(e)
        })?;

        let principal = RequestPrincipal::from_claims(&claims).map_err(|e| {
            tracing::error!(operation = %ctx.operation(), "Invalid user id in token: {}", claims.sub);
            e
        })?;

        tracing::Span::current().record("user_id", principal.user_id);

        let ctx = ctx.with_principal(principal);
        next.run(ctx).await
    }
}

/// Token from an authorization value.
///
/// A `Bearer` scheme prefix is stripped case-insensitively; a bare token is
/// accepted as is. `None` when nothing usable remains.
pub fn extract_bearer(value: Option<&str>) -> Option<&str> {
    let value = value?.trim();
    let token = match value.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {
            let rest = &value[6..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                value
            }
        }
        _ => value,
    };

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_prefix_forms() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(Some("bearer abc")), Some("abc"));
        assert_eq!(extract_bearer(Some("BEARER   abc ")), Some("abc"));
        assert_eq!(extract_bearer(Some("abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_bearer_missing_values() {
        assert_eq!(extract_bearer(None), None);
        assert_eq!(extract_bearer(Some("")), None);
        assert_eq!(extract_bearer(Some("   ")), None);
        assert_eq!(extract_bearer(Some("Bearer")), None);
        assert_eq!(extract_bearer(Some("Bearer   ")), None);
    }

    #[test]
    fn test_extract_bearer_does_not_split_words() {
        // A token that merely starts with the letters of the scheme
        assert_eq!(extract_bearer(Some("bearerish")), Some("bearerish"));
        // Multi-byte input shorter than the scheme boundary
        assert_eq!(extract_bearer(Some("令牌令牌")), Some("令牌令牌"));
    }
}
