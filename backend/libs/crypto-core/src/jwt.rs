//! Token codec shared by every Casso service
//!
//! Signs and verifies bearer credentials. The codec is built once at startup
//! from an explicit [`JwtConfig`] and is immutable afterwards, so a single
//! `Arc<JwtCodec>` can be read concurrently by every request without locking.
//!
//! ## Verification contract
//!
//! - The signature is checked before anything else: a tampered or malformed
//!   token is always [`JwtError::Invalid`], even when it is also expired.
//! - Expiry is a hard boundary: `now >= exp` is [`JwtError::Expired`]. No
//!   leeway is applied.
//! - Verification performs no I/O. Its result depends only on the token, the
//!   current time and the configured key.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use crypto_core::jwt::{JwtCodec, JwtConfig};
//!
//! let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET required");
//! let codec = JwtCodec::new(JwtConfig::hmac(secret)).expect("invalid JWT key");
//!
//! let claims = codec.claims_for(42, chrono::Utc::now().timestamp());
//! let token = codec.issue(&claims).unwrap();
//! assert_eq!(codec.verify(&token).unwrap(), claims);
//! ```

use chrono::{Duration, Utc};
use error_types::ServiceError;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Minimum HMAC secret length in bytes (256 bits)
pub const MIN_SECRET_LENGTH: usize = 32;

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

// ============================================================================
// Data Structures
// ============================================================================

/// Identity payload embedded in every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id, decimal string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Whether the claims are expired at `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token expired at {exp}")]
    Expired { exp: i64 },

    #[error("signing key misconfigured: {0}")]
    Signing(String),
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Invalid(_) => ServiceError::auth_invalid("token invalid").with_source(err),
            JwtError::Expired { .. } => {
                ServiceError::auth_expired("token expired").with_source(err)
            }
            JwtError::Signing(_) => {
                ServiceError::token_issuance("failed to issue token").with_source(err)
            }
        }
    }
}

/// Key material for the codec
#[derive(Clone)]
pub enum SigningKey {
    /// Shared secret for HS256 / HS384 / HS512
    Hmac { algorithm: Algorithm, secret: Vec<u8> },
    /// RSA key pair in PEM format for RS256. Without a private key the codec
    /// can verify but not issue.
    Rsa {
        private_key_pem: Option<String>,
        public_key_pem: String,
    },
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningKey::Hmac { algorithm, .. } => f
                .debug_struct("Hmac")
                .field("algorithm", algorithm)
                .finish_non_exhaustive(),
            SigningKey::Rsa {
                private_key_pem, ..
            } => f
                .debug_struct("Rsa")
                .field("can_sign", &private_key_pem.is_some())
                .finish_non_exhaustive(),
        }
    }
}

/// Codec configuration, typically loaded from the service config
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub key: SigningKey,
    pub ttl: Duration,
}

impl JwtConfig {
    /// HS256 with the given shared secret
    pub fn hmac(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            key: SigningKey::Hmac {
                algorithm: Algorithm::HS256,
                secret: secret.into(),
            },
            ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        }
    }

    /// RS256 key pair, able to issue and verify
    pub fn rsa(private_key_pem: impl Into<String>, public_key_pem: impl Into<String>) -> Self {
        Self {
            key: SigningKey::Rsa {
                private_key_pem: Some(private_key_pem.into()),
                public_key_pem: public_key_pem.into(),
            },
            ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        }
    }

    /// RS256 public key only, for services that never issue tokens
    pub fn rsa_verify_only(public_key_pem: impl Into<String>) -> Self {
        Self {
            key: SigningKey::Rsa {
                private_key_pem: None,
                public_key_pem: public_key_pem.into(),
            },
            ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Switch an HMAC config to HS384 / HS512. Ignored for RSA keys.
    pub fn with_hmac_algorithm(mut self, algorithm: Algorithm) -> Self {
        if let SigningKey::Hmac {
            algorithm: ref mut current,
            ..
        } = self.key
        {
            *current = algorithm;
        }
        self
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Immutable signer/verifier
pub struct JwtCodec {
    algorithm: Algorithm,
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCodec")
            .field("algorithm", &self.algorithm)
            .field("can_sign", &self.encoding_key.is_some())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtCodec {
    /// Parse and check the key material.
    ///
    /// ## Errors
    ///
    /// [`JwtError::Signing`] if:
    /// - an HMAC secret is shorter than [`MIN_SECRET_LENGTH`] bytes
    /// - an HMAC config names a non-HMAC algorithm
    /// - a PEM key cannot be parsed as RSA
    /// - the ttl is not positive
    pub fn new(config: JwtConfig) -> Result<Self, JwtError> {
        if config.ttl <= Duration::zero() {
            return Err(JwtError::Signing("token ttl must be positive".to_string()));
        }

        let (algorithm, encoding_key, decoding_key) = match &config.key {
            SigningKey::Hmac { algorithm, secret } => {
                if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
                    return Err(JwtError::Signing(format!(
                        "{algorithm:?} is not an HMAC algorithm"
                    )));
                }
                if secret.len() < MIN_SECRET_LENGTH {
                    return Err(JwtError::Signing(format!(
                        "HMAC secret must be at least {MIN_SECRET_LENGTH} bytes, got {}",
                        secret.len()
                    )));
                }
                (
                    *algorithm,
                    Some(EncodingKey::from_secret(secret)),
                    DecodingKey::from_secret(secret),
                )
            }
            SigningKey::Rsa {
                private_key_pem,
                public_key_pem,
            } => {
                let encoding_key = private_key_pem
                    .as_deref()
                    .map(|pem| {
                        EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
                            JwtError::Signing(format!("failed to parse RSA private key: {e}"))
                        })
                    })
                    .transpose()?;
                let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
                    .map_err(|e| JwtError::Signing(format!("failed to parse RSA public key: {e}")))?;
                (Algorithm::RS256, encoding_key, decoding_key)
            }
        };

        // Expiry is checked by hand so that the boundary is `now >= exp`
        // with zero leeway.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
            ttl: config.ttl,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Claims for `user_id` issued at `now` (Unix seconds), expiring after the
    /// configured ttl.
    pub fn claims_for(&self, user_id: i64, now: i64) -> Claims {
        Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.ttl.num_seconds(),
        }
    }

    /// Sign the claims.
    ///
    /// Deterministic for identical claims. Fails only when the codec has no
    /// signing key or the key is rejected by the signer.
    pub fn issue(&self, claims: &Claims) -> Result<String, JwtError> {
        let encoding_key = self.encoding_key.as_ref().ok_or_else(|| {
            JwtError::Signing("codec was built without a signing key".to_string())
        })?;

        encode(&Header::new(self.algorithm), claims, encoding_key)
            .map_err(|e| JwtError::Signing(format!("failed to sign token: {e}")))
    }

    /// Issue a fresh token for `user_id` valid from now.
    pub fn issue_for(&self, user_id: i64) -> Result<String, JwtError> {
        self.issue(&self.claims_for(user_id, Utc::now().timestamp()))
    }

    /// Verify against the wall clock.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify as if the current time were `now` (Unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, JwtError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    JwtErrorKind::InvalidSignature => {
                        JwtError::Invalid("signature does not match".to_string())
                    }
                    JwtErrorKind::InvalidAlgorithm => {
                        JwtError::Invalid("unexpected signing algorithm".to_string())
                    }
                    _ => JwtError::Invalid(e.to_string()),
                }
            })?;

        let claims = token_data.claims;
        if claims.is_expired_at(now) {
            return Err(JwtError::Expired { exp: claims.exp });
        }

        Ok(claims)
    }
}

// ============================================================================
// Tests
// ============================================================================
