//! Integration tests for the admission chain
//!
//! Exercises the standard pipeline (recovery → tracing → logging → auth)
//! end to end with real tokens.

use actix_middleware::{
    Middleware, Next, Outcome, Pipeline, Recovery, RequestContext, RequestLogging, RequestSpan,
    RouteSelector, Transport,
};
use async_trait::async_trait;
use crypto_core::jwt::{Claims, JwtCodec, JwtConfig};
use error_types::{ErrorKind, ServiceError};
use message_validation::{MessageRules, StringRule, Validate, ValidationError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SECRET: &str = "integration-secret-0123456789abcdef";
const GET_USER: &str = "/api.shop.service.v1.Shop/GetUser";
const LOGIN: &str = "/api.shop.service.v1.Shop/Login";

fn codec() -> Arc<JwtCodec> {
    Arc::new(JwtCodec::new(JwtConfig::hmac(SECRET)).unwrap())
}

fn pipeline(codec: Arc<JwtCodec>) -> Pipeline {
    Pipeline::standard(codec, RouteSelector::only([GET_USER])).build([GET_USER, LOGIN])
}

fn ctx(operation: &str) -> RequestContext {
    RequestContext::new(operation, Transport::Http)
}

fn bearer(codec: &JwtCodec, user_id: i64) -> String {
    format!("Bearer {}", codec.issue_for(user_id).unwrap())
}

struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Middleware for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Outcome {
        self.log.lock().unwrap().push(self.name);
        next.run(ctx).await
    }
}

struct Reject;

#[async_trait]
impl Middleware for Reject {
    fn name(&self) -> &'static str {
        "reject"
    }

    async fn handle(&self, _ctx: RequestContext, _next: Next<'_>) -> Outcome {
        Err(ServiceError::invalid_params("rejected"))
    }
}

#[test]
fn test_standard_stage_order() {
    let pipeline = pipeline(codec());

    assert_eq!(
        pipeline.stage_names(GET_USER),
        vec!["recovery", "tracing", "logging", "auth"]
    );
    assert_eq!(pipeline.stage_names(LOGIN), vec!["recovery", "tracing", "logging"]);
    // Undeclared operations fall back to the universal stages
    assert_eq!(
        pipeline.stage_names("/api.shop.service.v1.Shop/Unknown"),
        vec!["recovery", "tracing", "logging"]
    );
    // Normalization applies to lookups
    assert_eq!(pipeline.stage_names("api.shop.service.v1.Shop/GetUser/").len(), 4);
}

#[tokio::test]
async fn test_stages_run_in_declaration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::builder()
        .stage(RouteSelector::All, Recorder { name: "first", log: log.clone() })
        .stage(RouteSelector::only(["/svc.A/Op"]), Recorder { name: "second", log: log.clone() })
        .stage(RouteSelector::All, Recorder { name: "third", log: log.clone() })
        .build(["/svc.A/Op", "/svc.A/Other"]);

    pipeline
        .dispatch(ctx("/svc.A/Op"), (), |_, _| async { Ok(()) })
        .await
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);

    log.lock().unwrap().clear();
    pipeline
        .dispatch(ctx("/svc.A/Other"), (), |_, _| async { Ok(()) })
        .await
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["first", "third"]);
}

#[tokio::test]
async fn test_short_circuit_skips_handler() {
    let calls = AtomicUsize::new(0);
    let pipeline = Pipeline::builder()
        .stage(RouteSelector::All, Reject)
        .build(["/svc.A/Op"]);

    let err = pipeline
        .dispatch(ctx("/svc.A/Op"), (), |_, _| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidParams);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_protected_operation_without_token_is_auth_missing() {
    let pipeline = pipeline(codec());
    let request = ctx(GET_USER);
    let request_id = request.request_id().to_string();

    let err = pipeline
        .dispatch(request, (), |_, _| async { Ok("unreachable") })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthMissing);
    assert_eq!(err.trace_id(), Some(request_id.as_str()));
}

#[tokio::test]
async fn test_empty_bearer_is_auth_missing() {
    let pipeline = pipeline(codec());
    for value in ["", "   ", "Bearer", "Bearer  "] {
        let err = pipeline
            .dispatch(ctx(GET_USER).with_authorization(value), (), |_, _| async { Ok(()) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthMissing, "value {value:?}");
    }
}

#[tokio::test]
async fn test_unprotected_operation_needs_no_token() {
    let pipeline = pipeline(codec());

    let reply = pipeline
        .dispatch(ctx(LOGIN), 5, |ctx, n: i32| async move {
            assert!(ctx.principal().is_none());
            Ok(n * 2)
        })
        .await
        .unwrap();
    assert_eq!(reply, 10);

    // A garbage carrier is never inspected on an unprotected route
    let reply = pipeline
        .dispatch(ctx(LOGIN).with_authorization("Bearer garbage"), (), |_, _| async {
            Ok("ok")
        })
        .await
        .unwrap();
    assert_eq!(reply, "ok");
}

#[tokio::test]
async fn test_valid_token_reaches_handler_with_principal() {
    let codec = codec();
    let pipeline = pipeline(codec.clone());

    let user_id = pipeline
        .dispatch(
            ctx(GET_USER).with_authorization(bearer(&codec, 42)),
            (),
            |ctx, _| async move { Ok(ctx.require_principal()?.user_id) },
        )
        .await
        .unwrap();
    assert_eq!(user_id, 42);
}

#[tokio::test]
async fn test_bare_token_without_scheme_is_accepted() {
    let codec = codec();
    let pipeline = pipeline(codec.clone());
    let token = codec.issue_for(8).unwrap();

    let user_id = pipeline
        .dispatch(ctx(GET_USER).with_authorization(token), (), |ctx, _| async move {
            Ok(ctx.require_principal()?.user_id)
        })
        .await
        .unwrap();
    assert_eq!(user_id, 8);
}

#[tokio::test]
async fn test_tampered_token_is_auth_invalid() {
    let codec = codec();
    let pipeline = pipeline(codec.clone());

    let token = codec.issue_for(1).unwrap();
    let (head, signature) = token.rsplit_once('.').unwrap();
    let first = if signature.starts_with('Q') { 'R' } else { 'Q' };
    let tampered = format!("Bearer {head}.{first}{}", &signature[1..]);

    let err = pipeline
        .dispatch(ctx(GET_USER).with_authorization(tampered), (), |_, _| async { Ok(()) })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthInvalid);
}

#[tokio::test]
async fn test_expired_token_is_auth_expired() {
    let codec = codec();
    let pipeline = pipeline(codec.clone());
    let now = chrono::Utc::now().timestamp();
    let token = codec
        .issue(&Claims {
            sub: "3".to_string(),
            iat: now - 120,
            exp: now - 60,
        })
        .unwrap();

    let err = pipeline
        .dispatch(
            ctx(GET_USER).with_authorization(format!("Bearer {token}")),
            (),
            |_, _| async { Ok(()) },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthExpired);
}

#[tokio::test]
async fn test_non_numeric_subject_is_auth_invalid() {
    let codec = codec();
    let pipeline = pipeline(codec.clone());
    let now = chrono::Utc::now().timestamp();
    let token = codec
        .issue(&Claims {
            sub: "alice".to_string(),
            iat: now,
            exp: now + 60,
        })
        .unwrap();

    let err = pipeline
        .dispatch(ctx(GET_USER).with_authorization(token), (), |_, _| async { Ok(()) })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthInvalid);
}

#[tokio::test]
async fn test_panic_becomes_unknown_and_service_keeps_running() {
    let codec = codec();
    let pipeline = pipeline(codec.clone());

    let err = pipeline
        .dispatch(ctx(LOGIN), (), |_, _| async {
            if true {
                panic!("handler exploded");
            }
            Ok(())
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(err.public_message(), "internal error");

    // Protected route, panic behind the auth stage
    let err = pipeline
        .dispatch(
            ctx(GET_USER).with_authorization(bearer(&codec, 1)),
            (),
            |_, _| async {
                if true {
                    panic!("behind auth");
                }
                Ok(())
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);

    let reply = pipeline
        .dispatch(ctx(LOGIN), (), |_, _| async { Ok("still serving") })
        .await
        .unwrap();
    assert_eq!(reply, "still serving");
}

struct PanickingAuth;

#[async_trait]
impl Middleware for PanickingAuth {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn handle(&self, _ctx: RequestContext, _next: Next<'_>) -> Outcome {
        panic!("auth stage exploded");
    }
}

#[tokio::test]
async fn test_panic_in_auth_stage_becomes_unknown() {
    let pipeline = Pipeline::builder()
        .stage(RouteSelector::All, Recovery)
        .stage(RouteSelector::All, RequestSpan)
        .stage(RouteSelector::All, RequestLogging)
        .stage(RouteSelector::only([GET_USER]), PanickingAuth)
        .build([GET_USER, LOGIN]);
    assert_eq!(
        pipeline.stage_names(GET_USER),
        vec!["recovery", "tracing", "logging", "auth"]
    );

    let reached = Arc::new(AtomicUsize::new(0));
    let counter = reached.clone();
    let err = pipeline
        .dispatch(ctx(GET_USER).with_request_id("req-auth"), (), |_, _| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(err.public_message(), "internal error");
    assert_eq!(err.trace_id(), Some("req-auth"));
    assert_eq!(reached.load(Ordering::SeqCst), 0);

    // Same pipeline keeps serving, on both routes
    let reply = pipeline
        .dispatch(ctx(LOGIN), (), |_, _| async { Ok("still serving") })
        .await
        .unwrap();
    assert_eq!(reply, "still serving");

    let err = pipeline
        .dispatch(ctx(GET_USER), (), |_, _| async { Ok(()) })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
}

#[tokio::test]
async fn test_cancelled_request_never_reaches_handler() {
    let pipeline = pipeline(codec());
    let calls = AtomicUsize::new(0);
    let request = ctx(LOGIN);
    request.cancellation().cancel();

    let err = pipeline
        .dispatch(request, (), |_, _| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancellation_interrupts_running_handler() {
    let pipeline = pipeline(codec());
    let request = ctx(LOGIN);
    let token = request.cancellation().clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = pipeline
        .dispatch(request, (), |_, _| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let pipeline = pipeline(codec());

    let err = pipeline
        .dispatch(
            ctx(LOGIN).with_timeout(Duration::from_millis(20)),
            (),
            |_, _| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
}

struct LoginBody {
    mobile: String,
    pass: String,
}

impl Validate for LoginBody {
    fn validate(&self) -> Result<(), ValidationError> {
        MessageRules::new("LoginRequest")
            .string("Mobile", &self.mobile, &[StringRule::Len(11)])
            .string("Pass", &self.pass, &[StringRule::LenBetween(6, 18)])
            .finish()
    }
}

#[tokio::test]
async fn test_validation_runs_before_handler() {
    let pipeline = pipeline(codec());
    let calls = AtomicUsize::new(0);

    let body = LoginBody {
        mobile: "1380013800".to_string(),
        pass: "123456".to_string(),
    };
    let err = pipeline
        .dispatch_validated(ctx(LOGIN), body, |_, _| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(err.field(), Some("Mobile"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let body = LoginBody {
        mobile: "13800138000".to_string(),
        pass: "123456".to_string(),
    };
    let mobile = pipeline
        .dispatch_validated(ctx(LOGIN), body, |_, body| async move { Ok(body.mobile) })
        .await
        .unwrap();
    assert_eq!(mobile, "13800138000");
}

#[tokio::test]
async fn test_auth_precedes_validation() {
    let pipeline = pipeline(codec());
    let body = LoginBody {
        mobile: "bad".to_string(),
        pass: "x".to_string(),
    };

    let err = pipeline
        .dispatch_validated(ctx(GET_USER), body, |_, _| async { Ok(()) })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthMissing);
}
