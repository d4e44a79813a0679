//! # Runtime configuration
//!
//! Read from the environment once at startup (a `.env` file is loaded first
//! when present).
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `NEST_HOST` | Bind address | `0.0.0.0` |
//! | `NEST_PORT` | Bind port | `3001` |
//! | `NEST_DB_PATH` | SQLite database file | `nest.db` |
//! | `NEST_JWT_SECRET` | Session signing secret | Required |
//! | `NEST_NONCE_TTL_SECS` | Lifetime of a wallet login nonce | `300` |
//! | `NEST_COOKIE_SECURE` | Mark the session cookie `Secure` | `false` |
//! | `RUST_LOG` | Log filter | `nest=debug,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const HOST_ENV: &str = "NEST_HOST";
pub const PORT_ENV: &str = "NEST_PORT";
pub const DB_PATH_ENV: &str = "NEST_DB_PATH";
pub const JWT_SECRET_ENV: &str = "NEST_JWT_SECRET";
pub const NONCE_TTL_ENV: &str = "NEST_NONCE_TTL_SECS";
pub const COOKIE_SECURE_ENV: &str = "NEST_COOKIE_SECURE";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DB_PATH: &str = "nest.db";
pub const DEFAULT_NONCE_TTL_SECS: u64 = 300;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("NEST_JWT_SECRET is unset or still a placeholder")]
    WeakJwtSecret,

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub nonce_ttl: Duration,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup(JWT_SECRET_ENV).unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::WeakJwtSecret);
        }

        Ok(Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.into()),
            port: parse_or(&lookup, PORT_ENV, DEFAULT_PORT)?,
            db_path: lookup(DB_PATH_ENV).unwrap_or_else(|| DEFAULT_DB_PATH.into()).into(),
            jwt_secret,
            nonce_ttl: Duration::from_secs(parse_or(&lookup, NONCE_TTL_ENV, DEFAULT_NONCE_TTL_SECS)?),
            cookie_secure: parse_or(&lookup, COOKIE_SECURE_ENV, false)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                value: self.host.clone(),
            })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = config(&[(JWT_SECRET_ENV, "a-real-secret")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.db_path, PathBuf::from("nest.db"));
        assert_eq!(config.nonce_ttl, Duration::from_secs(300));
        assert!(!config.cookie_secure);
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:3001");
    }

    #[test]
    fn missing_or_placeholder_secret_is_rejected() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::WeakJwtSecret);
        assert_eq!(
            config(&[(JWT_SECRET_ENV, "dev-secret-change-me")]).unwrap_err(),
            ConfigError::WeakJwtSecret
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            (JWT_SECRET_ENV, "a-real-secret"),
            (PORT_ENV, "8080"),
            (NONCE_TTL_ENV, "60"),
            (COOKIE_SECURE_ENV, "true"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.nonce_ttl, Duration::from_secs(60));
        assert!(config.cookie_secure);
    }

    #[test]
    fn bad_number_names_the_variable() {
        let err = config(&[(JWT_SECRET_ENV, "a-real-secret"), (PORT_ENV, "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: PORT_ENV,
                value: "eighty".into()
            }
        );
    }
}
