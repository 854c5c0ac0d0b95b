//! Persisted document shape.
//!
//! The snapshot is the only unit ever written to or read from disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier for posts and accounts.
pub type RecordId = u64;

/// A short text post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Dense id, assigned on creation
    pub id: RecordId,
    /// Text as stored
    pub body: String,
}

/// A user account. The secret is only ever held as a hash.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Dense id, assigned on creation
    pub id: RecordId,
    /// Unique across accounts
    pub email: String,
    /// PHC-encoded secret hash
    #[serde(with = "hash_bytes")]
    pub secret_hash: Vec<u8>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("secret_hash", &"[REDACTED]")
            .finish()
    }
}

/// Every persisted table at one instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSnapshot {
    /// Posts by id
    #[serde(default)]
    pub posts: BTreeMap<RecordId, Post>,
    /// Accounts by id
    #[serde(default)]
    pub accounts: BTreeMap<RecordId, Account>,
    /// Revoked token strings and when they were revoked
    #[serde(default)]
    pub revocations: BTreeMap<String, DateTime<Utc>>,
}

/// Table sizes of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotStats {
    /// Number of posts
    pub posts: usize,
    /// Number of accounts
    pub accounts: usize,
    /// Number of revoked tokens
    pub revocations: usize,
}

impl DocumentSnapshot {
    /// Next post id. Ids are dense because nothing is ever deleted.
    #[must_use]
    pub fn next_post_id(&self) -> RecordId {
        self.posts.len() as RecordId + 1
    }

    /// Next account id.
    #[must_use]
    pub fn next_account_id(&self) -> RecordId {
        self.accounts.len() as RecordId + 1
    }

    /// Linear scan for an account by email.
    #[must_use]
    pub fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts.values().find(|account| account.email == email)
    }

    /// Table sizes.
    #[must_use]
    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            posts: self.posts.len(),
            accounts: self.accounts.len(),
            revocations: self.revocations.len(),
        }
    }
}

/// Hash bytes are stored as base64 text.
mod hash_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
