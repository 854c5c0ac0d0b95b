//! Test fixtures with sample data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signing secret long enough for the configuration check.
pub const SIGNING_SECRET: &str = "fixture-signing-secret-0123456789abcdef";

/// A second secret for cross-key rejection tests.
pub const FOREIGN_SECRET: &str = "fixture-foreign-secret-fedcba9876543210";

/// Instant most scenario tests start from.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

/// Sample account credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleAccount {
    /// Email address
    pub email: String,
    /// Plaintext secret
    pub secret: String,
}

impl SampleAccount {
    /// A first account.
    #[must_use]
    pub fn alice() -> Self {
        Self {
            email: "alice@example.com".to_string(),
            secret: "correct horse battery staple".to_string(),
        }
    }

    /// A second account.
    #[must_use]
    pub fn bob() -> Self {
        Self {
            email: "bob@example.com".to_string(),
            secret: "hunter2".to_string(),
        }
    }
}

/// Hand-written snapshot document with one record of each kind.
///
/// The hash bytes are not a valid PHC string, so authenticating this
/// account must fail as corrupt.
#[must_use]
pub fn sample_snapshot_json() -> serde_json::Value {
    serde_json::json!({
        "posts": {
            "1": { "id": 1, "body": "first post" }
        },
        "accounts": {
            "1": { "id": 1, "email": "alice@example.com", "secret_hash": "bm90LWEtaGFzaA==" }
        },
        "revocations": {
            "header.payload.signature": "2023-11-14T22:13:20Z"
        }
    })
}
