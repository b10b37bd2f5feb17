use actix_middleware::RequestContext;
use crypto_core::jwt::JwtCodec;
use crypto_core::{hash_password, verify_password};
use error_types::ServiceError;
use std::sync::Arc;

use crate::grpc::pb::{
    CreateUserReply, CreateUserRequest, DeleteUserReply, DeleteUserRequest, GetTokenReply,
    GetTokenRequest, GetUserReply, GetUserRequest, ListUserReply, ListUserRequest,
    UpdateUserReply, UpdateUserRequest, UserInfo,
};
use crate::repo::{NewUser, RepoError, UserChanges, UserRecord, UserRepo};

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Offset and limit for a 1-based page. Pages below 1 read as the first
/// page; a non-positive size falls back to [`DEFAULT_PAGE_SIZE`].
pub fn page_window(page_num: i64, page_size: i64) -> (usize, usize) {
    let page_num = page_num.max(1);
    let page_size = if page_size > 0 {
        page_size
    } else {
        DEFAULT_PAGE_SIZE
    };
    let offset = (page_num - 1).saturating_mul(page_size);
    (
        usize::try_from(offset).unwrap_or(usize::MAX),
        usize::try_from(page_size).unwrap_or(usize::MAX),
    )
}

fn user_info(record: UserRecord) -> UserInfo {
    UserInfo {
        id: record.id,
        mobile: record.mobile,
        nick_name: record.nick_name,
        age: record.age,
    }
}

fn require_id(id: i64) -> Result<i64, ServiceError> {
    if id == 0 {
        return Err(ServiceError::invalid_params("id is required"));
    }
    Ok(id)
}

/// User account operations behind the admission chain
pub struct UserService {
    repo: Arc<dyn UserRepo>,
    codec: Arc<JwtCodec>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepo>, codec: Arc<JwtCodec>) -> Self {
        Self { repo, codec }
    }

    pub async fn create_user(
        &self,
        req: CreateUserRequest,
    ) -> Result<CreateUserReply, ServiceError> {
        if req.nick_name.is_empty() || req.mobile.is_empty() {
            return Err(ServiceError::invalid_params("nick_name and mobile are required"));
        }

        let pass = req.pass;
        let pass_hash = tokio::task::spawn_blocking(move || hash_password(&pass))
            .await
            .map_err(ServiceError::internal)??;

        let record = self
            .repo
            .create(NewUser {
                mobile: req.mobile,
                pass_hash,
                nick_name: req.nick_name,
                age: req.age,
            })
            .await?;

        tracing::info!(user_id = record.id, "User created");
        Ok(CreateUserReply {
            user: Some(user_info(record)),
        })
    }

    pub async fn get_user(&self, req: GetUserRequest) -> Result<GetUserReply, ServiceError> {
        let record = self.repo.get(require_id(req.id)?).await?;
        Ok(GetUserReply {
            user: Some(user_info(record)),
        })
    }

    /// Empty `nick_name` and zero `age` leave the stored values unchanged.
    pub async fn update_user(
        &self,
        ctx: &RequestContext,
        req: UpdateUserRequest,
    ) -> Result<UpdateUserReply, ServiceError> {
        let caller = ctx.require_principal()?.user_id;
        let id = require_id(req.id)?;
        let changes = UserChanges {
            nick_name: (!req.nick_name.is_empty()).then_some(req.nick_name),
            age: (req.age != 0).then_some(req.age),
        };

        let record = self.repo.update(id, changes).await?;

        tracing::info!(user_id = id, caller, "User updated");
        Ok(UpdateUserReply {
            user: Some(user_info(record)),
        })
    }

    pub async fn delete_user(
        &self,
        ctx: &RequestContext,
        req: DeleteUserRequest,
    ) -> Result<DeleteUserReply, ServiceError> {
        let caller = ctx.require_principal()?.user_id;
        let id = require_id(req.id)?;
        self.repo.delete(id).await?;

        tracing::info!(user_id = id, caller, "User deleted");
        Ok(DeleteUserReply { ok: true })
    }

    pub async fn list_user(&self, req: ListUserRequest) -> Result<ListUserReply, ServiceError> {
        let (offset, limit) = page_window(req.page_num.into(), req.page_size.into());
        let users = self.repo.list(offset, limit).await?;

        Ok(ListUserReply {
            users: users.into_iter().map(user_info).collect(),
        })
    }

    /// Exchange mobile and password for a token.
    pub async fn get_token(&self, req: GetTokenRequest) -> Result<GetTokenReply, ServiceError> {
        let record = self.repo.find_by_mobile(&req.mobile).await.map_err(|e| match e {
            RepoError::NotFound => ServiceError::not_found("user not found"),
            other => other.into(),
        })?;

        let pass = req.pass;
        let stored = record.pass_hash;
        let matches = tokio::task::spawn_blocking(move || verify_password(&pass, &stored))
            .await
            .map_err(ServiceError::internal)??;

        if !matches {
            tracing::warn!(user_id = record.id, "Token request rejected: wrong password");
            return Err(ServiceError::invalid_params("mobile or password is incorrect"));
        }

        Ok(GetTokenReply {
            token: self.codec.issue_for(record.id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(1, 10), (0, 10));
        assert_eq!(page_window(3, 20), (40, 20));
        assert_eq!(page_window(0, 5), (0, 5));
        assert_eq!(page_window(-4, 5), (0, 5));
        assert_eq!(page_window(2, 0), (10, 10));
        assert_eq!(page_window(2, -1), (10, 10));
    }
}
