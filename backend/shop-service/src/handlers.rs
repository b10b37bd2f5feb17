//! HTTP handlers
//!
//! Each handler resolves its operation identifier and hands the raw body to
//! the admission pipeline, which decodes and validates it; business logic runs
//! only once every stage and the validator have accepted the request.

use actix_middleware::HttpAdmission;
use actix_web::{web, HttpRequest, HttpResponse};
use error_types::ServiceError;
use serde_json::json;

use crate::models::{GetUserRequest, LoginRequest, RegisterRequest};
use crate::routes::operations;
use crate::service::ShopService;

pub async fn register(
    req: HttpRequest,
    admission: web::Data<HttpAdmission>,
    shop: web::Data<ShopService>,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let shop = shop.into_inner();
    let reply = admission
        .dispatch_json(&req, operations::REGISTER, body, |_, body: RegisterRequest| async move {
            shop.register(body).await
        })
        .await?;

    Ok(HttpResponse::Ok().json(reply))
}

pub async fn login(
    req: HttpRequest,
    admission: web::Data<HttpAdmission>,
    shop: web::Data<ShopService>,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let shop = shop.into_inner();
    let reply = admission
        .dispatch_json(&req, operations::LOGIN, body, |_, body: LoginRequest| async move {
            shop.login(body).await
        })
        .await?;

    Ok(HttpResponse::Ok().json(reply))
}

pub async fn get_user(
    req: HttpRequest,
    admission: web::Data<HttpAdmission>,
    shop: web::Data<ShopService>,
) -> Result<HttpResponse, ServiceError> {
    let shop = shop.into_inner();
    let body = GetUserRequest::default();
    let reply = admission
        .dispatch_validated(&req, operations::GET_USER, body, |ctx, _| async move {
            shop.get_user(&ctx).await
        })
        .await?;

    Ok(HttpResponse::Ok().json(reply))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok", "service": "shop-service" }))
}
