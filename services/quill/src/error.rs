//! Error taxonomy for the store, credential and session layers.
//!
//! Every failure carries enough discriminant information for the transport
//! layer to pick a response class without inspecting messages:
//! - storage failures are internal (500-class)
//! - business conditions are client errors (4xx-class)
//! - token failures are authentication errors (401-class)

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Unified error type for all Quill operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QuillError {
    /// Backing file could not be read or written
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An account already uses this email
    #[error("An account with email {email} already exists")]
    DuplicateEmail {
        /// The conflicting email
        email: String,
    },

    /// Requested record does not exist
    #[error("{entity} not found")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
    },

    /// Secret did not verify against the stored hash
    #[error("Invalid credentials")]
    InvalidCredential,

    /// Stored hash could not be parsed
    #[error("Stored secret hash is corrupt: {0}")]
    CorruptHash(String),

    /// Post body rejected before storage
    #[error("Invalid post body: {reason}")]
    InvalidBody {
        /// Why the body was rejected
        reason: String,
    },

    /// Authorization header has no `<scheme> <token>` shape
    #[error("Authorization header is malformed")]
    MalformedHeader,

    /// Token signature or encoding did not verify
    #[error("Token signature invalid")]
    InvalidSignature,

    /// Token expiry is in the past
    #[error("Token expired at {expired_at}")]
    Expired {
        /// When the token stopped being valid
        expired_at: DateTime<Utc>,
    },

    /// Token issuer claim does not match the expected kind
    #[error("Expected a {expected} token but got {actual}")]
    WrongTokenType {
        /// Issuer the caller asked for
        expected: &'static str,
        /// Issuer found in the token
        actual: String,
    },

    /// Refresh token is on the revocation ledger
    #[error("Token has been revoked")]
    Revoked,

    /// Subject claim is not an account id
    #[error("Token subject is not a valid account id")]
    MalformedSubject,

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else that should never reach a client verbatim
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Snapshot could not be read, written or decoded
    StorageFailure,
    /// Email already taken
    DuplicateEmail,
    /// Record missing
    NotFound,
    /// Secret did not verify
    InvalidCredential,
    /// Post body rejected
    InvalidBody,
    /// Header is not `<scheme> <token>`
    MalformedHeader,
    /// Token failed signature or decoding
    InvalidSignature,
    /// Token past its expiry
    Expired,
    /// Access token where refresh was expected, or the reverse
    WrongTokenType,
    /// Refresh token on the ledger
    Revoked,
    /// Subject is not an account id
    MalformedSubject,
    /// Anything else
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StorageFailure => "STORAGE_FAILURE",
            Self::DuplicateEmail => "ACCOUNT_DUPLICATE_EMAIL",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidCredential => "AUTH_INVALID_CREDENTIAL",
            Self::InvalidBody => "POST_INVALID_BODY",
            Self::MalformedHeader => "AUTH_HEADER_MALFORMED",
            Self::InvalidSignature => "AUTH_TOKEN_INVALID",
            Self::Expired => "AUTH_TOKEN_EXPIRED",
            Self::WrongTokenType => "AUTH_TOKEN_WRONG_TYPE",
            Self::Revoked => "AUTH_TOKEN_REVOKED",
            Self::MalformedSubject => "AUTH_SUBJECT_MALFORMED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Response class this code belongs to
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::StorageFailure | Self::Internal => ErrorClass::Internal,
            Self::DuplicateEmail | Self::NotFound | Self::InvalidCredential | Self::InvalidBody => {
                ErrorClass::Client
            }
            Self::MalformedHeader
            | Self::InvalidSignature
            | Self::Expired
            | Self::WrongTokenType
            | Self::Revoked
            | Self::MalformedSubject => ErrorClass::Unauthenticated,
        }
    }
}

/// Coarse response class used by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Operation failed on our side
    Internal,
    /// Caller supplied something we reject
    Client,
    /// Caller could not be authenticated
    Unauthenticated,
}

impl QuillError {
    /// Get the error code for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) | Self::Serialization(_) => ErrorCode::StorageFailure,
            Self::DuplicateEmail { .. } => ErrorCode::DuplicateEmail,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidCredential => ErrorCode::InvalidCredential,
            Self::InvalidBody { .. } => ErrorCode::InvalidBody,
            Self::MalformedHeader => ErrorCode::MalformedHeader,
            Self::InvalidSignature => ErrorCode::InvalidSignature,
            Self::Expired { .. } => ErrorCode::Expired,
            Self::WrongTokenType { .. } => ErrorCode::WrongTokenType,
            Self::Revoked => ErrorCode::Revoked,
            Self::MalformedSubject => ErrorCode::MalformedSubject,
            Self::CorruptHash(_) | Self::Config(_) | Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Response class for this error
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.code().class()
    }

    /// HTTP-equivalent status code.
    ///
    /// Not-found maps to 404 and duplicate email to 409; every other client
    /// error is a plain 400.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.code() {
            ErrorCode::NotFound => 404,
            ErrorCode::DuplicateEmail => 409,
            code => match code.class() {
                ErrorClass::Internal => 500,
                ErrorClass::Client => 400,
                ErrorClass::Unauthenticated => 401,
            },
        }
    }

    /// True for authentication failures.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self.class(), ErrorClass::Unauthenticated)
    }

    pub(crate) fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn invalid_body(reason: impl Into<String>) -> Self {
        Self::InvalidBody {
            reason: reason.into(),
        }
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<argon2::password_hash::Error> for QuillError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::CorruptHash(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QuillError>;
