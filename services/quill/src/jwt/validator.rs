//! Inbound token validation and the revocation gate.
//!
//! Validation order for a bearer header:
//! 1. split `<scheme> <token>`
//! 2. verify signature and expiry
//! 3. compare the issuer claim with the expected kind
//! 4. refresh tokens only: consult the revocation ledger
//! 5. read the subject as an account id

use crate::error::{QuillError, Result};
use crate::jwt::claims::TokenKind;
use crate::jwt::token::{Token, Unvalidated, Validated};
use crate::store::RecordId;
use chrono::{DateTime, Utc};
use jsonwebtoken::DecodingKey;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Read side of the revocation ledger.
pub trait RevocationLedger {
    /// True iff this exact token string has been revoked.
    fn is_revoked(&self, token: &str) -> Result<bool>;
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme itself is not interpreted.
///
/// # Errors
///
/// Returns `QuillError::MalformedHeader` when there is no space separator or
/// nothing after it.
pub fn bearer_token(header: &str) -> Result<&str> {
    let (_scheme, token) = header.split_once(' ').ok_or(QuillError::MalformedHeader)?;
    let token = token.trim();
    if token.is_empty() {
        return Err(QuillError::MalformedHeader);
    }
    Ok(token)
}

/// Verifies tokens signed with the process-wide HMAC key.
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
}

impl TokenValidator {
    /// Validator for tokens signed with `secret`.
    pub fn new(secret: &SecretString) -> Self {
        TokenValidator {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        }
    }

    /// Steps 2-3 on a bare token string.
    pub fn verify(
        &self,
        raw: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Token<Validated>> {
        Token::<Unvalidated>::parse(raw)?
            .validate_signature(&self.decoding_key)?
            .validate_claims(expected, now)
    }

    /// Steps 1-3 on an `Authorization` header value.
    pub fn verify_header(
        &self,
        header: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Token<Validated>> {
        self.verify(bearer_token(header)?, expected, now)
    }

    /// Full validation, returning the subject account id.
    pub fn validate<L>(
        &self,
        header: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
        ledger: &L,
    ) -> Result<RecordId>
    where
        L: RevocationLedger + ?Sized,
    {
        let token = self.verify_header(header, expected, now)?;
        ensure_not_revoked(&token, ledger)?;
        token.subject_id()
    }
}

/// Step 4. Access tokens are never looked up; only their lifetime limits them.
pub fn ensure_not_revoked<L>(token: &Token<Validated>, ledger: &L) -> Result<()>
where
    L: RevocationLedger + ?Sized,
{
    if token.kind() == TokenKind::Refresh && ledger.is_revoked(token.raw())? {
        debug!("Refresh token is revoked");
        return Err(QuillError::Revoked);
    }
    Ok(())
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator").finish_non_exhaustive()
    }
}
