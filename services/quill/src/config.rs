//! Service configuration.
//!
//! Everything is read from environment variables (after loading an optional
//! `.env` file) and validated once at startup.

use crate::credential::HashParams;
use crate::error::{QuillError, Result};
use crate::jwt::AccessExpiry;
use crate::jwt::issuer::{DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, MAX_ACCESS_TTL};
use crate::observability;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;

/// Shortest signing secret accepted, in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

/// Quill configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Snapshot file location
    pub database_path: PathBuf,
    /// HMAC key for access and refresh tokens
    pub jwt_secret: SecretString,
    /// Access token lifetime policy
    pub access_expiry: AccessExpiry,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Argon2 work factor for account secrets
    pub hash_params: HashParams,
    /// Default log filter
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::Config` if `JWT_SECRET` is missing or short, or if
    /// any variable fails to parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_path = PathBuf::from(
            lookup("QUILL_DATABASE_PATH").unwrap_or_else(|| "database.json".to_string()),
        );

        let jwt_secret = lookup("JWT_SECRET")
            .map(SecretString::from)
            .ok_or_else(|| QuillError::config("JWT_SECRET is required"))?;
        if jwt_secret.expose_secret().len() < MIN_SECRET_BYTES {
            return Err(QuillError::config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        let access_ttl = Duration::from_secs(parse_var(
            &lookup,
            "ACCESS_TOKEN_TTL",
            DEFAULT_ACCESS_TTL.as_secs(),
        )?);
        let refresh_token_ttl = Duration::from_secs(parse_var(
            &lookup,
            "REFRESH_TOKEN_TTL",
            DEFAULT_REFRESH_TTL.as_secs(),
        )?);
        if access_ttl.is_zero() || refresh_token_ttl.is_zero() {
            return Err(QuillError::config("Token lifetimes must be positive"));
        }

        let access_expiry = match lookup("ACCESS_TOKEN_POLICY")
            .unwrap_or_else(|| "fixed".to_string())
            .to_lowercase()
            .as_str()
        {
            "fixed" => AccessExpiry::Fixed(access_ttl),
            "capped" => {
                let max = Duration::from_secs(parse_var(
                    &lookup,
                    "ACCESS_TOKEN_MAX_TTL",
                    MAX_ACCESS_TTL.as_secs(),
                )?);
                if max < access_ttl {
                    return Err(QuillError::config(
                        "ACCESS_TOKEN_MAX_TTL must not be below ACCESS_TOKEN_TTL",
                    ));
                }
                AccessExpiry::Capped {
                    default: access_ttl,
                    max,
                }
            }
            other => {
                return Err(QuillError::config(format!(
                    "Invalid ACCESS_TOKEN_POLICY: {other}"
                )));
            }
        };

        let defaults = HashParams::default();
        let hash_params = HashParams {
            memory_kib: parse_var(&lookup, "HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_var(&lookup, "HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_var(&lookup, "HASH_PARALLELISM", defaults.parallelism)?,
        };

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        observability::parse_filter(&log_level)?;

        Ok(Self {
            database_path,
            jwt_secret,
            access_expiry,
            refresh_token_ttl,
            hash_params,
            log_level,
            log_json: parse_var(&lookup, "LOG_JSON", false)?,
        })
    }
}

/// Parse a variable, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .parse()
            .map_err(|e| QuillError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}
