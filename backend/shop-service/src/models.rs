//! Shop request and reply messages
//!
//! JSON field names follow the `api.shop.service.v1` message definitions.

use message_validation::{MessageRules, StringRule, Validate, ValidationError};
use serde::{Deserialize, Serialize};

const MOBILE_RULES: &[StringRule<'static>] = &[StringRule::Len(11)];
const PASS_RULES: &[StringRule<'static>] = &[StringRule::LenBetween(6, 18)];

/// Code carried by successful envelope replies
pub const REPLY_OK: i64 = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub mobile: String,
    pub pass: String,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub age: i64,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        MessageRules::new("RegisterRequest")
            .string("Mobile", &self.mobile, MOBILE_RULES)
            .string("Pass", &self.pass, PASS_RULES)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub mobile: String,
    pub nick_name: String,
    pub age: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub mobile: String,
    pub pass: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        MessageRules::new("LoginRequest")
            .string("Mobile", &self.mobile, MOBILE_RULES)
            .string("Pass", &self.pass, PASS_RULES)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginReply {
    pub code: i64,
    pub data: Option<LoginReplyData>,
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginReplyData {
    pub token: String,
}

impl Validate for LoginReply {
    fn validate(&self) -> Result<(), ValidationError> {
        MessageRules::new("LoginReply")
            .embedded("Data", self.data.as_ref())
            .finish()
    }
}

impl Validate for LoginReplyData {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// The caller is identified by the bearer token; the body is empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetUserRequest {}

impl Validate for GetUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetUserReply {
    pub code: i64,
    pub data: Option<GetUserReplyData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetUserReplyData {
    #[serde(rename = "Name")]
    pub name: String,
}

impl Validate for GetUserReply {
    fn validate(&self) -> Result<(), ValidationError> {
        MessageRules::new("GetUserReply")
            .embedded("Data", self.data.as_ref())
            .finish()
    }
}

impl Validate for GetUserReplyData {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}
