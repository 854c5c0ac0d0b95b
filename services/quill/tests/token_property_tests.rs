//! Property-based tests for token issue and validation.
//!
//! Property 1: Access tokens yield their subject until expiry, then fail
//! Property 2: Token kinds never substitute for each other
//! Property 3: Headers without a separator are malformed

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use proptest::prelude::*;
use quill::jwt::RevocationLedger;
use quill::jwt::issuer::DEFAULT_REFRESH_TTL;
use quill::{AccessExpiry, QuillError, TokenIssuer, TokenKind, TokenValidator};
use secrecy::SecretString;
use std::time::Duration;
use test_utils::fixtures::{FOREIGN_SECRET, SIGNING_SECRET};
use test_utils::{
    account_id_strategy, malformed_header_strategy, ttl_strategy, unix_time_strategy,
};

struct NothingRevoked;

impl RevocationLedger for NothingRevoked {
    fn is_revoked(&self, _token: &str) -> quill::Result<bool> {
        Ok(false)
    }
}

fn secret() -> SecretString {
    SecretString::from(SIGNING_SECRET.to_string())
}

fn issuer(expiry: AccessExpiry) -> TokenIssuer {
    TokenIssuer::new(&secret(), expiry, DEFAULT_REFRESH_TTL)
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property 1: valid strictly before expiry, `Expired` from expiry on.
    #[test]
    fn prop_access_valid_until_expiry(
        subject in account_id_strategy(),
        issued in unix_time_strategy(),
        elapsed in 0i64..3600,
        overdue in 0i64..86_400,
    ) {
        let validator = TokenValidator::new(&secret());
        let token = issuer(AccessExpiry::default()).issue_access(subject, at(issued)).unwrap();
        let header = format!("Bearer {token}");

        let before =
            validator.validate(&header, TokenKind::Access, at(issued + elapsed), &NothingRevoked);
        prop_assert_eq!(before.unwrap(), subject);

        let after = validator.validate(
            &header,
            TokenKind::Access,
            at(issued + 3600 + overdue),
            &NothingRevoked,
        );
        let expired_at_exp = matches!(
            after,
            Err(QuillError::Expired { expired_at }) if expired_at == at(issued + 3600)
        );
        prop_assert!(expired_at_exp, "token past its lifetime was not reported expired");
    }

    /// Property 1b: capped policy honours any in-range request.
    #[test]
    fn prop_capped_ttl_honoured(subject in account_id_strategy(), ttl in ttl_strategy()) {
        let capped = issuer(AccessExpiry::Capped {
            default: Duration::from_secs(3600),
            max: Duration::from_secs(86_400),
        });
        let validator = TokenValidator::new(&secret());
        let now = at(1_700_000_000);
        let token = capped.issue_access_with_ttl(subject, now, Some(ttl)).unwrap();

        let validated = validator.verify(&token, TokenKind::Access, now).unwrap();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap();
        prop_assert_eq!(validated.expires_at(), now + ChronoDuration::seconds(ttl_secs));
    }

    /// Property 2: each kind is rejected where the other is expected.
    #[test]
    fn prop_kinds_do_not_substitute(
        subject in account_id_strategy(),
        issued in unix_time_strategy(),
    ) {
        let issuer = issuer(AccessExpiry::default());
        let validator = TokenValidator::new(&secret());

        let access = issuer.issue_access(subject, at(issued)).unwrap();
        let refresh = issuer.issue_refresh(subject, at(issued)).unwrap();

        let access_rejected = matches!(
            validator.verify(&access, TokenKind::Refresh, at(issued)),
            Err(QuillError::WrongTokenType { .. })
        );
        prop_assert!(access_rejected, "access token accepted as refresh");

        let refresh_rejected = matches!(
            validator.verify(&refresh, TokenKind::Access, at(issued)),
            Err(QuillError::WrongTokenType { .. })
        );
        prop_assert!(refresh_rejected, "refresh token accepted as access");
    }

    /// Property 3: no separator means `MalformedHeader`.
    #[test]
    fn prop_headers_without_space_are_malformed(header in malformed_header_strategy()) {
        let validator = TokenValidator::new(&secret());
        let result =
            validator.validate(&header, TokenKind::Access, at(1_700_000_000), &NothingRevoked);
        let malformed = matches!(result, Err(QuillError::MalformedHeader));
        prop_assert!(malformed, "header without separator was not malformed");
    }

    /// Tokens signed with another key never verify.
    #[test]
    fn prop_foreign_key_rejected(subject in account_id_strategy()) {
        let foreign = TokenIssuer::new(
            &SecretString::from(FOREIGN_SECRET.to_string()),
            AccessExpiry::default(),
            DEFAULT_REFRESH_TTL,
        );
        let token = foreign.issue_refresh(subject, at(1_700_000_000)).unwrap();

        let result =
            TokenValidator::new(&secret()).verify(&token, TokenKind::Refresh, at(1_700_000_000));
        let rejected = matches!(result, Err(QuillError::InvalidSignature));
        prop_assert!(rejected, "token from a foreign key verified");
    }
}
