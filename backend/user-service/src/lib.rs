//! User gRPC service: account CRUD, paging and token issuance behind the
//! shared admission pipeline.

pub mod config;
pub mod grpc;
pub mod repo;
pub mod service;
pub mod validation;

use crypto_core::jwt::{JwtCodec, JwtError};
use grpc_jwt_propagation::GrpcAdmission;
use std::sync::Arc;

use crate::config::Config;
use crate::grpc::UserGrpcService;
use crate::repo::UserRepo;
use crate::service::UserService;

/// Wire codec, pipeline and service together. Fails when the signing key is
/// unusable.
pub fn build_service(
    config: &Config,
    repo: Arc<dyn UserRepo>,
) -> Result<UserGrpcService, JwtError> {
    let codec = Arc::new(JwtCodec::new(config.jwt_config())?);
    let pipeline = Arc::new(grpc::build_pipeline(codec.clone()));
    let admission = GrpcAdmission::new(pipeline, config.request_timeout());

    Ok(UserGrpcService::new(
        admission,
        Arc::new(UserService::new(repo, codec)),
    ))
}
