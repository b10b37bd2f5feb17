/// gRPC server implementation for user-service
///
/// Every RPC enters through [`GrpcAdmission`]; UpdateUser, DeleteUser and
/// ListUser are registered as protected in [`build_pipeline`].
use actix_middleware::{Pipeline, RouteSelector};
use crypto_core::jwt::JwtCodec;
use grpc_jwt_propagation::GrpcAdmission;
use std::sync::Arc;
use tonic::{Request, Response, Status};

use crate::service::UserService;

// Import generated protobuf types
pub mod pb {
    tonic::include_proto!("api.user.service.v1");
}

use pb::user_server::User;
use pb::{
    CreateUserReply, CreateUserRequest, DeleteUserReply, DeleteUserRequest, GetTokenReply,
    GetTokenRequest, GetUserReply, GetUserRequest, ListUserReply, ListUserRequest,
    UpdateUserReply, UpdateUserRequest,
};

pub use pb::user_server::UserServer;

/// Full method names as seen by the admission chain
pub mod operations {
    pub const CREATE_USER: &str = "/api.user.service.v1.User/CreateUser";
    pub const UPDATE_USER: &str = "/api.user.service.v1.User/UpdateUser";
    pub const DELETE_USER: &str = "/api.user.service.v1.User/DeleteUser";
    pub const GET_USER: &str = "/api.user.service.v1.User/GetUser";
    pub const LIST_USER: &str = "/api.user.service.v1.User/ListUser";
    pub const GET_TOKEN: &str = "/api.user.service.v1.User/GetToken";

    pub const ALL: [&str; 6] = [
        CREATE_USER,
        UPDATE_USER,
        DELETE_USER,
        GET_USER,
        LIST_USER,
        GET_TOKEN,
    ];

    pub const PROTECTED: [&str; 3] = [UPDATE_USER, DELETE_USER, LIST_USER];
}

pub fn build_pipeline(codec: Arc<JwtCodec>) -> Pipeline {
    Pipeline::standard(codec, RouteSelector::only(operations::PROTECTED)).build(operations::ALL)
}

#[derive(Clone)]
pub struct UserGrpcService {
    admission: GrpcAdmission,
    service: Arc<UserService>,
}

impl UserGrpcService {
    pub fn new(admission: GrpcAdmission, service: Arc<UserService>) -> Self {
        Self { admission, service }
    }

    pub fn into_server(self) -> UserServer<Self> {
        UserServer::new(self)
    }
}

#[tonic::async_trait]
impl User for UserGrpcService {
    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> Result<Response<CreateUserReply>, Status> {
        let service = &self.service;
        self.admission
            .dispatch_validated(request, operations::CREATE_USER, |_, req| async move {
                service.create_user(req).await
            })
            .await
    }

    async fn update_user(
        &self,
        request: Request<UpdateUserRequest>,
    ) -> Result<Response<UpdateUserReply>, Status> {
        let service = &self.service;
        self.admission
            .dispatch_validated(request, operations::UPDATE_USER, |ctx, req| async move {
                service.update_user(&ctx, req).await
            })
            .await
    }

    async fn delete_user(
        &self,
        request: Request<DeleteUserRequest>,
    ) -> Result<Response<DeleteUserReply>, Status> {
        let service = &self.service;
        self.admission
            .dispatch_validated(request, operations::DELETE_USER, |ctx, req| async move {
                service.delete_user(&ctx, req).await
            })
            .await
    }

    async fn get_user(
        &self,
        request: Request<GetUserRequest>,
    ) -> Result<Response<GetUserReply>, Status> {
        let service = &self.service;
        self.admission
            .dispatch_validated(request, operations::GET_USER, |_, req| async move {
                service.get_user(req).await
            })
            .await
    }

    async fn list_user(
        &self,
        request: Request<ListUserRequest>,
    ) -> Result<Response<ListUserReply>, Status> {
        let service = &self.service;
        self.admission
            .dispatch_validated(request, operations::LIST_USER, |_, req| async move {
                service.list_user(req).await
            })
            .await
    }

    async fn get_token(
        &self,
        request: Request<GetTokenRequest>,
    ) -> Result<Response<GetTokenReply>, Status> {
        let service = &self.service;
        self.admission
            .dispatch_validated(request, operations::GET_TOKEN, |_, req| async move {
                service.get_token(req).await
            })
            .await
    }
}
