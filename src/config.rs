//! Application configuration loaded from environment variables.

use std::str::FromStr;

use thiserror::Error;

use crate::db::DbConfig;
use crate::media::cloudinary::CloudinaryConfig;

/// Default request body cap: five 5 MiB images plus the text fields.
const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("JWT_SECRET must be set to a non-empty value in production")]
    InsecureJwtSecret,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub cloudinary: CloudinaryConfig,
}

/// Token signing settings for the admin auth gate.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_hours: i64,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var          | Default       |
    /// |------------------|---------------|
    /// | `ENVIRONMENT`    | `development` |
    /// | `HOST`           | `127.0.0.1`   |
    /// | `PORT`           | `5000`        |
    /// | `MAX_BODY_BYTES` | 32 MiB        |
    ///
    /// Database, JWT and Cloudinary settings are read by their own loaders.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env_or("ENVIRONMENT", "development");
        let jwt = JwtConfig::from_env()?;
        if environment == "production" && jwt.secret.trim().is_empty() {
            return Err(ConfigError::InsecureJwtSecret);
        }

        Ok(Self {
            host: env_or("HOST", "127.0.0.1"),
            port: parse_env("PORT", 5000)?,
            max_body_bytes: parse_env("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            db: DbConfig::from_env()?,
            jwt,
            cloudinary: CloudinaryConfig::from_env()?,
            environment,
        })
    }
}

impl JwtConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret: required("JWT_SECRET")?,
            expiry_hours: parse_env("JWT_EXPIRY_HOURS", 24)?,
        })
    }
}

pub(crate) fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

pub(crate) fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

/// Parse an optional variable, treating a malformed value as an error rather
/// than silently falling back to the default.
pub(crate) fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
