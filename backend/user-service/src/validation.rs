//! Field rules for `api.user.service.v1` request messages

use message_validation::{MessageRules, StringRule, Validate, ValidationError};

use crate::grpc::pb::{
    CreateUserRequest, DeleteUserRequest, GetTokenRequest, GetUserRequest, ListUserReply,
    ListUserRequest, UpdateUserRequest, UserInfo,
};

const MOBILE_RULES: &[StringRule<'static>] = &[StringRule::Len(11)];
const PASS_RULES: &[StringRule<'static>] = &[StringRule::LenBetween(6, 18)];

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        MessageRules::new("CreateUserRequest")
            .string("Mobile", &self.mobile, MOBILE_RULES)
            .string("Pass", &self.pass, PASS_RULES)
            .finish()
    }
}

impl Validate for GetTokenRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        MessageRules::new("GetTokenRequest")
            .string("Mobile", &self.mobile, MOBILE_RULES)
            .string("Pass", &self.pass, PASS_RULES)
            .finish()
    }
}

// No declared rules; id == 0 is rejected by the handlers as InvalidParams.

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Validate for GetUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Validate for DeleteUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Validate for ListUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Validate for UserInfo {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Validate for ListUserReply {
    fn validate(&self) -> Result<(), ValidationError> {
        MessageRules::new("ListUserReply")
            .embedded_each("Users", &self.users)
            .finish()
    }
}
