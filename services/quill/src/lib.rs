//! Quill core library.
//!
//! A file-backed document store for posts, accounts and a refresh token
//! revocation ledger, plus the access/refresh token lifecycle built on it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod content;
pub mod credential;
pub mod error;
pub mod jwt;
pub mod metrics;
pub mod observability;
pub mod session;
pub mod store;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use credential::{CredentialManager, HashParams};
pub use error::{QuillError, Result};
pub use jwt::{AccessExpiry, TokenIssuer, TokenKind, TokenValidator};
pub use session::{LoginGrant, SessionService};
pub use store::{Account, DocumentStore, Post, RecordId};
