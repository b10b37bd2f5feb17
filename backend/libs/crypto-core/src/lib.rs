//! Credential primitives: bearer token codec and password hashing.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtCodec, JwtConfig, JwtError, SigningKey};
pub use password::{hash_password, verify_password, PasswordError};
