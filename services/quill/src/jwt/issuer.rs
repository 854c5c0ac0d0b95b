//! Token minting.

use crate::error::{QuillError, Result};
use crate::jwt::claims::{Claims, TokenKind};
use crate::metrics;
use crate::store::RecordId;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

/// Fixed access token lifetime.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(60 * 60);
/// Upper bound for caller-requested access lifetimes.
pub const MAX_ACCESS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Refresh token lifetime.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(60 * 24 * 60 * 60);

/// How the lifetime of an access token is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessExpiry {
    /// Always the same lifetime; caller requests are ignored.
    Fixed(Duration),
    /// Caller may ask for a lifetime up to `max`; otherwise `default`.
    Capped {
        /// Lifetime when nothing (or too much) is requested
        default: Duration,
        /// Largest lifetime a caller may request
        max: Duration,
    },
}

impl Default for AccessExpiry {
    fn default() -> Self {
        Self::Fixed(DEFAULT_ACCESS_TTL)
    }
}

impl AccessExpiry {
    /// Lifetime used when the caller asks for nothing.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        match self {
            Self::Fixed(ttl) => *ttl,
            Self::Capped { default, .. } => *default,
        }
    }

    /// Lifetime for a caller request under this policy.
    #[must_use]
    pub fn resolve(&self, requested: Option<Duration>) -> Duration {
        match (self, requested) {
            (Self::Capped { max, .. }, Some(ttl)) if !ttl.is_zero() && ttl <= *max => ttl,
            _ => self.default_ttl(),
        }
    }
}

/// Signs access and refresh tokens with the process-wide HMAC key.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    access_expiry: AccessExpiry,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Issuer signing with `secret`.
    pub fn new(secret: &SecretString, access_expiry: AccessExpiry, refresh_ttl: Duration) -> Self {
        TokenIssuer {
            encoding_key: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            access_expiry,
            refresh_ttl,
        }
    }

    /// Access lifetime policy in force.
    pub fn access_expiry(&self) -> AccessExpiry {
        self.access_expiry
    }

    /// Access token with the policy's default lifetime.
    pub fn issue_access(&self, subject: RecordId, now: DateTime<Utc>) -> Result<String> {
        self.issue_access_with_ttl(subject, now, None)
    }

    /// Access token honouring `requested` when the policy allows it.
    pub fn issue_access_with_ttl(
        &self,
        subject: RecordId,
        now: DateTime<Utc>,
        requested: Option<Duration>,
    ) -> Result<String> {
        let ttl = self.access_expiry.resolve(requested);
        self.sign(&Claims::new(TokenKind::Access, subject, now, ttl))
    }

    /// Refresh token with the configured lifetime.
    pub fn issue_refresh(&self, subject: RecordId, now: DateTime<Utc>) -> Result<String> {
        self.sign(&Claims::new(TokenKind::Refresh, subject, now, self.refresh_ttl))
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| QuillError::internal(format!("Token signing failed: {e}")))?;

        metrics::record_token_issued(&claims.iss);
        debug!(token_type = %claims.iss, subject = %claims.sub, exp = claims.exp, "Issued token");
        Ok(token)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_expiry", &self.access_expiry)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}
