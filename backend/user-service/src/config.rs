/// Configuration management
use actix_middleware::LogFormat;
use crypto_core::jwt::JwtConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid listen address {0}")]
    Address(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub server_host: String,
    /// gRPC listen port
    #[serde(default = "default_port")]
    pub server_port: u16,
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl_secs")]
    pub jwt_ttl_secs: i64,
    /// Default per-call deadline; 0 disables it. A shorter `grpc-timeout`
    /// from the caller still applies.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_jwt_ttl_secs() -> i64 {
    86_400
}

// Covers an Argon2 hash or verify on an unoptimised build with headroom
fn default_request_timeout_ms() -> u64 {
    5_000
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::from_env()?)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server_host, self.server_port);
        addr.parse().map_err(|_| ConfigError::Address(addr))
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::hmac(self.jwt_secret.as_bytes())
            .with_ttl(chrono::Duration::seconds(self.jwt_ttl_secs))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: (&str, &str) = ("JWT_SECRET", "0123456789abcdef0123456789abcdef");

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::from_iter(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[SECRET]).unwrap();

        assert_eq!(config.server_port, 9000);
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:9000");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_bad_host_is_rejected() {
        let config = from_pairs(&[SECRET, ("SERVER_HOST", "not a host")]).unwrap();
        assert!(matches!(config.listen_addr(), Err(ConfigError::Address(_))));
    }

    #[test]
    fn test_ttl_override_reaches_jwt_config() {
        let config = from_pairs(&[SECRET, ("JWT_TTL_SECS", "60")]).unwrap();
        assert_eq!(config.jwt_config().ttl, chrono::Duration::seconds(60));
    }
}
