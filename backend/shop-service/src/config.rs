/// Configuration management
use actix_middleware::LogFormat;
use crypto_core::jwt::JwtConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl_secs")]
    pub jwt_ttl_secs: i64,
    /// Per-request deadline; 0 disables it
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_jwt_ttl_secs() -> i64 {
    86_400
}

// Covers an Argon2 hash or verify on an unoptimised build with headroom
fn default_request_timeout_ms() -> u64 {
    5_000
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
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

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_apply() {
        let config: Config = envy::from_iter(vars(&[(
            "JWT_SECRET",
            "0123456789abcdef0123456789abcdef",
        )]))
        .unwrap();

        assert_eq!(config.server_port, 8000);
        assert_eq!(config.jwt_ttl_secs, 86_400);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides_and_disabled_timeout() {
        let config: Config = envy::from_iter(vars(&[
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("SERVER_PORT", "9100"),
            ("REQUEST_TIMEOUT_MS", "0"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 9100);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        assert!(envy::from_iter::<_, Config>(vars(&[])).is_err());
    }
}
