//! Client-side bearer interceptor
//!
//! Injects the caller's token into outgoing gRPC requests via the
//! `authorization` metadata entry, optionally with a request id so that logs
//! on both sides share one trace id.

use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};

use crate::server::{AUTHORIZATION_KEY, REQUEST_ID_KEY};

#[derive(Debug, thiserror::Error)]
pub enum InterceptorError {
    #[error("value for {0} is not valid ASCII metadata")]
    InvalidMetadata(&'static str),
}

/// Adds `authorization: Bearer <token>` to every outgoing request
///
/// ## Usage
///
/// ```rust,no_run
/// use grpc_jwt_propagation::JwtClientInterceptor;
/// use tonic::transport::Channel;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let interceptor = JwtClientInterceptor::new("eyJhbGc...")?;
/// let channel = Channel::from_static("http://[::1]:9000").connect().await?;
/// // let mut client = UserClient::with_interceptor(channel, interceptor);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JwtClientInterceptor {
    /// Pre-formatted "Bearer {token}"
    auth_header: AsciiMetadataValue,
    request_id: Option<AsciiMetadataValue>,
}

impl JwtClientInterceptor {
    /// `jwt_token` is the bare token, without the scheme.
    pub fn new(jwt_token: impl AsRef<str>) -> Result<Self, InterceptorError> {
        let auth_header = AsciiMetadataValue::try_from(format!("Bearer {}", jwt_token.as_ref()))
            .map_err(|_| InterceptorError::InvalidMetadata(AUTHORIZATION_KEY))?;

        Ok(Self {
            auth_header,
            request_id: None,
        })
    }

    /// Forward an already formatted authorization value unchanged.
    pub fn from_header(auth_header: AsciiMetadataValue) -> Self {
        Self {
            auth_header,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: &str) -> Result<Self, InterceptorError> {
        let value = AsciiMetadataValue::try_from(request_id)
            .map_err(|_| InterceptorError::InvalidMetadata(REQUEST_ID_KEY))?;
        self.request_id = Some(value);
        Ok(self)
    }
}

impl Interceptor for JwtClientInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let metadata = request.metadata_mut();
        metadata.insert(AUTHORIZATION_KEY, self.auth_header.clone());
        if let Some(request_id) = &self.request_id {
            metadata.insert(REQUEST_ID_KEY, request_id.clone());
        }

        Ok(request)
    }
}
