//! Claim set carried by every token.

use crate::store::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which half of the session a token belongs to, carried in `iss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Short-lived, authorizes resource-modifying requests
    Access,
    /// Long-lived, only mints new access tokens
    Refresh,
}

impl TokenKind {
    /// Value of the issuer claim for this kind.
    #[must_use]
    pub const fn issuer(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }

    /// Parse an issuer claim.
    #[must_use]
    pub fn from_issuer(issuer: &str) -> Option<Self> {
        match issuer {
            "access" => Some(Self::Access),
            "refresh" => Some(Self::Refresh),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.issuer())
    }
}

/// Claim set shared by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Issuer, which doubles as the token kind
    pub iss: String,
    /// Account id as a decimal string
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    /// Claims for `subject`, valid for `ttl` from `issued_at`.
    pub fn new(
        kind: TokenKind,
        subject: RecordId,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let iat = issued_at.timestamp();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Claims {
            iss: kind.issuer().to_string(),
            sub: subject.to_string(),
            iat,
            exp: iat.saturating_add(ttl),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Token kind, if the issuer claim names one.
    pub fn kind(&self) -> Option<TokenKind> {
        TokenKind::from_issuer(&self.iss)
    }

    /// Subject as a positive account id.
    pub fn subject_id(&self) -> Option<RecordId> {
        self.sub.parse::<RecordId>().ok().filter(|id| *id > 0)
    }

    /// Expired from the `exp` second onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// `exp` as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// `iat` as a timestamp.
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
