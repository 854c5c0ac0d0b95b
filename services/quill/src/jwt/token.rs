//! Type-state token wrapper.
//!
//! Claims are only reachable once the token has passed signature, expiry and
//! issuer checks, so a half-verified token can never be trusted by accident.

use crate::error::{QuillError, Result};
use crate::jwt::claims::{Claims, TokenKind};
use crate::store::RecordId;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use tracing::debug;

mod private {
    pub trait Sealed {}
}

/// Marker trait for token validation states
pub trait TokenState: private::Sealed {
    /// Human-readable state name for debugging
    fn state_name() -> &'static str;
}

/// Just read from the wire, nothing verified
#[derive(Debug)]
pub struct Unvalidated;
impl private::Sealed for Unvalidated {}
impl TokenState for Unvalidated {
    fn state_name() -> &'static str {
        "Unvalidated"
    }
}

/// Signature verified, claims decoded but not yet checked
#[derive(Debug)]
pub struct SignatureValidated {
    claims: Claims,
}
impl private::Sealed for SignatureValidated {}
impl TokenState for SignatureValidated {
    fn state_name() -> &'static str {
        "SignatureValidated"
    }
}

/// Signature, expiry and issuer verified
#[derive(Debug)]
pub struct Validated {
    claims: Claims,
    kind: TokenKind,
}
impl private::Sealed for Validated {}
impl TokenState for Validated {
    fn state_name() -> &'static str {
        "Validated"
    }
}

/// Raw token plus whatever its current state has proven.
#[derive(Debug)]
pub struct Token<State: TokenState> {
    raw: String,
    state: State,
}

impl Token<Unvalidated> {
    /// Check the token is structurally a JWT.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::InvalidSignature` if the header cannot be decoded.
    pub fn parse(raw: &str) -> Result<Self> {
        decode_header(raw).map_err(|e| {
            debug!(reason = %e, "Token header rejected");
            QuillError::InvalidSignature
        })?;

        Ok(Token {
            raw: raw.to_string(),
            state: Unvalidated,
        })
    }

    /// Verify the HMAC signature and decode claims.
    ///
    /// Time-based claims are checked separately against caller-supplied time.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::InvalidSignature` for any verification or decoding
    /// failure.
    pub fn validate_signature(self, key: &DecodingKey) -> Result<Token<SignatureValidated>> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(&self.raw, key, &validation).map_err(|e| {
            debug!(reason = %e, "Token signature rejected");
            QuillError::InvalidSignature
        })?;

        Ok(Token {
            raw: self.raw,
            state: SignatureValidated {
                claims: token_data.claims,
            },
        })
    }
}

impl Token<SignatureValidated> {
    /// Check expiry at `now`, then the issuer against `expected`.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::Expired` or `QuillError::WrongTokenType`.
    pub fn validate_claims(
        self,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Token<Validated>> {
        let claims = self.state.claims;

        if claims.is_expired_at(now) {
            return Err(QuillError::Expired {
                expired_at: claims.expires_at(),
            });
        }

        match claims.kind() {
            Some(kind) if kind == expected => Ok(Token {
                raw: self.raw,
                state: Validated { claims, kind },
            }),
            _ => Err(QuillError::WrongTokenType {
                expected: expected.issuer(),
                actual: claims.iss,
            }),
        }
    }

    /// Read-only access to claims that passed signature checks only.
    pub fn peek_claims(&self) -> &Claims {
        &self.state.claims
    }
}

impl Token<Validated> {
    /// Access claims - only available on fully validated tokens
    pub fn claims(&self) -> &Claims {
        &self.state.claims
    }

    /// Kind proven by the issuer check.
    pub fn kind(&self) -> TokenKind {
        self.state.kind
    }

    /// The token exactly as presented.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// When the token stops being valid.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.state.claims.expires_at()
    }

    /// Subject claim as an account id.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::MalformedSubject` if it is not a positive integer.
    pub fn subject_id(&self) -> Result<RecordId> {
        self.state
            .claims
            .subject_id()
            .ok_or(QuillError::MalformedSubject)
    }
}

impl<S: TokenState> Token<S> {
    /// Get the current state name
    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::Duration;

    const SECRET: &[u8] = b"test-secret-key-for-testing-only-32bytes";

    fn signed(claims: &Claims, secret: &[u8]) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let claims = Claims::new(TokenKind::Access, 5, at(1_000), Duration::from_secs(60));
        let raw = signed(&claims, SECRET);

        let token = Token::<Unvalidated>::parse(&raw).unwrap();
        assert_eq!(token.state_name(), "Unvalidated");

        let token = token
            .validate_signature(&DecodingKey::from_secret(SECRET))
            .unwrap();
        assert_eq!(token.state_name(), "SignatureValidated");
        assert_eq!(token.peek_claims(), &claims);

        let token = token.validate_claims(TokenKind::Access, at(1_010)).unwrap();
        assert_eq!(token.state_name(), "Validated");
        assert_eq!(token.kind(), TokenKind::Access);
        assert_eq!(token.subject_id().unwrap(), 5);
        assert_eq!(token.raw(), raw);
        assert_eq!(token.expires_at(), at(1_060));
    }

    #[test]
    fn test_garbage_is_invalid_signature() {
        for raw in ["not-a-jwt", ""] {
            let result = Token::<Unvalidated>::parse(raw);
            assert!(matches!(result, Err(QuillError::InvalidSignature)));
        }
    }

    #[test]
    fn test_wrong_key_is_invalid_signature() {
        let claims = Claims::new(TokenKind::Access, 5, at(1_000), Duration::from_secs(60));
        let raw = signed(&claims, b"another-secret-key-that-is-long-enough");

        let result = Token::<Unvalidated>::parse(&raw)
            .unwrap()
            .validate_signature(&DecodingKey::from_secret(SECRET));
        assert!(matches!(result, Err(QuillError::InvalidSignature)));
    }

    #[test]
    fn test_tampered_payload_is_invalid_signature() {
        let claims = Claims::new(TokenKind::Access, 5, at(1_000), Duration::from_secs(60));
        let raw = signed(&claims, SECRET);
        let forged_claims = Claims {
            sub: "6".to_string(),
            ..claims
        };
        let forged = signed(&forged_claims, SECRET);

        let mut parts: Vec<&str> = raw.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        let result = Token::<Unvalidated>::parse(&tampered)
            .unwrap()
            .validate_signature(&DecodingKey::from_secret(SECRET));
        assert!(matches!(result, Err(QuillError::InvalidSignature)));
    }

    #[test]
    fn test_expired_before_issuer_check() {
        let claims = Claims::new(TokenKind::Access, 5, at(1_000), Duration::from_secs(60));
        let raw = signed(&claims, SECRET);

        let result = Token::<Unvalidated>::parse(&raw)
            .unwrap()
            .validate_signature(&DecodingKey::from_secret(SECRET))
            .unwrap()
            .validate_claims(TokenKind::Refresh, at(2_000));

        assert!(matches!(
            result,
            Err(QuillError::Expired { expired_at }) if expired_at == at(1_060)
        ));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let claims = Claims::new(TokenKind::Access, 5, at(1_000), Duration::from_secs(60));
        let raw = signed(&claims, SECRET);

        let result = Token::<Unvalidated>::parse(&raw)
            .unwrap()
            .validate_signature(&DecodingKey::from_secret(SECRET))
            .unwrap()
            .validate_claims(TokenKind::Refresh, at(1_000));

        assert!(matches!(
            result,
            Err(QuillError::WrongTokenType { expected: "refresh", ref actual })
                if actual == "access"
        ));
    }

    #[test]
    fn test_foreign_issuer_is_wrong_type() {
        let mut claims = Claims::new(TokenKind::Access, 5, at(1_000), Duration::from_secs(60));
        claims.iss = "legacy-issuer".to_string();
        let raw = signed(&claims, SECRET);

        let result = Token::<Unvalidated>::parse(&raw)
            .unwrap()
            .validate_signature(&DecodingKey::from_secret(SECRET))
            .unwrap()
            .validate_claims(TokenKind::Access, at(1_000));
        assert!(matches!(result, Err(QuillError::WrongTokenType { .. })));
    }

    #[test]
    fn test_malformed_subject() {
        let mut claims = Claims::new(TokenKind::Access, 5, at(1_000), Duration::from_secs(60));
        claims.sub = "user-5".to_string();
        let raw = signed(&claims, SECRET);

        let token = Token::<Unvalidated>::parse(&raw)
            .unwrap()
            .validate_signature(&DecodingKey::from_secret(SECRET))
            .unwrap()
            .validate_claims(TokenKind::Access, at(1_000))
            .unwrap();
        assert!(matches!(token.subject_id(), Err(QuillError::MalformedSubject)));
    }
}
