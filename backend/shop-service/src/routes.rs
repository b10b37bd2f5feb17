use actix_middleware::{Pipeline, RouteSelector};
use actix_web::web;
use crypto_core::jwt::JwtCodec;
use std::sync::Arc;

use crate::handlers;

/// Operation identifiers of the shop service
pub mod operations {
    pub const REGISTER: &str = "/api.shop.service.v1.Shop/Register";
    pub const LOGIN: &str = "/api.shop.service.v1.Shop/Login";
    pub const GET_USER: &str = "/api.shop.service.v1.Shop/GetUser";

    pub const ALL: [&str; 3] = [REGISTER, LOGIN, GET_USER];

    /// Operations that require a bearer token
    pub const PROTECTED: [&str; 1] = [GET_USER];
}

/// Admission pipeline for every shop operation
pub fn build_pipeline(codec: Arc<JwtCodec>) -> Pipeline {
    Pipeline::standard(codec, RouteSelector::only(operations::PROTECTED)).build(operations::ALL)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/v1/shop")
                .route("/register", web::post().to(handlers::register))
                .route("/login", web::post().to(handlers::login))
                .route("/user", web::get().to(handlers::get_user)),
        );
}

