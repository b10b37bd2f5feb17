//! Shop HTTP service: registration, login and the authenticated profile
//! lookup, all behind the shared admission pipeline.

pub mod config;
pub mod handlers;
pub mod models;
pub mod repo;
pub mod routes;
pub mod service;

use actix_middleware::HttpAdmission;
use actix_web::web;
use crypto_core::jwt::{JwtCodec, JwtError};
use std::sync::Arc;

use crate::config::Config;
use crate::repo::AccountRepo;
use crate::service::ShopService;

/// Shared application state handed to every actix worker
#[derive(Clone)]
pub struct AppState {
    pub admission: web::Data<HttpAdmission>,
    pub shop: web::Data<ShopService>,
}

impl AppState {
    /// Fails when the signing key is unusable.
    pub fn new(config: &Config, repo: Arc<dyn AccountRepo>) -> Result<Self, JwtError> {
        let codec = Arc::new(JwtCodec::new(config.jwt_config())?);
        let pipeline = Arc::new(routes::build_pipeline(codec.clone()));

        Ok(Self {
            admission: web::Data::new(HttpAdmission::new(pipeline, config.request_timeout())),
            shop: web::Data::new(ShopService::new(repo, codec)),
        })
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.admission.clone())
            .app_data(self.shop.clone())
            .configure(routes::configure);
    }
}
