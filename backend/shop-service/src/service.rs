use actix_middleware::RequestContext;
use crypto_core::jwt::JwtCodec;
use crypto_core::{hash_password, verify_password};
use error_types::ServiceError;
use std::sync::Arc;

use crate::models::{
    GetUserReply, GetUserReplyData, LoginReply, LoginReplyData, LoginRequest, RegisterRequest,
    RegisterResponse, REPLY_OK,
};
use crate::repo::{AccountRepo, NewAccount, RepoError};

/// Shop business logic. Requests reaching these methods have already passed
/// the admission chain.
pub struct ShopService {
    repo: Arc<dyn AccountRepo>,
    codec: Arc<JwtCodec>,
}

impl ShopService {
    pub fn new(repo: Arc<dyn AccountRepo>, codec: Arc<JwtCodec>) -> Self {
        Self { repo, codec }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse, ServiceError> {
        if req.nick_name.trim().is_empty() {
            return Err(ServiceError::invalid_params("nick_name is required"));
        }

        let pass = req.pass;
        let pass_hash = tokio::task::spawn_blocking(move || hash_password(&pass))
            .await
            .map_err(ServiceError::internal)??;

        let account = self
            .repo
            .create(NewAccount {
                mobile: req.mobile,
                pass_hash,
                nick_name: req.nick_name,
                age: req.age,
            })
            .await?;

        tracing::info!(user_id = account.id, "User registered");

        Ok(RegisterResponse {
            id: account.id,
            mobile: account.mobile,
            nick_name: account.nick_name,
            age: account.age,
        })
    }

    /// Exchange mobile and password for a token.
    ///
    /// Unknown mobile is `NotFound`; a wrong password is `InvalidParams`.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginReply, ServiceError> {
        let account = self.repo.find_by_mobile(&req.mobile).await.map_err(|e| match e {
            RepoError::NotFound => ServiceError::not_found("user not found"),
            other => other.into(),
        })?;

        let pass = req.pass;
        let stored = account.pass_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&pass, &stored))
            .await
            .map_err(ServiceError::internal)??;

        if !matches {
            tracing::warn!(user_id = account.id, "Login rejected: wrong password");
            return Err(ServiceError::invalid_params("mobile or password is incorrect"));
        }

        let token = self.codec.issue_for(account.id)?;

        Ok(LoginReply {
            code: REPLY_OK,
            data: Some(LoginReplyData { token }),
            msg: "login success".to_string(),
        })
    }

    /// Profile of the authenticated caller.
    pub async fn get_user(&self, ctx: &RequestContext) -> Result<GetUserReply, ServiceError> {
        let principal = ctx.require_principal()?;
        let account = self.repo.get(principal.user_id).await?;

        Ok(GetUserReply {
            code: REPLY_OK,
            data: Some(GetUserReplyData {
                name: account.nick_name,
            }),
        })
    }
}
