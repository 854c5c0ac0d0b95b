//! Account secret hashing.
//!
//! Secrets are hashed with Argon2id into PHC strings; the stored bytes are the
//! UTF-8 PHC encoding, so each hash carries its own salt and work factor.

use crate::error::{QuillError, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

/// Argon2 work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Hashes and verifies account secrets.
#[derive(Clone)]
pub struct CredentialManager {
    hasher: Argon2<'static>,
}

impl CredentialManager {
    /// Build a manager with the given work factor.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::Config` if the parameters are out of range.
    pub fn new(params: HashParams) -> Result<Self> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| QuillError::config(format!("Invalid hash parameters: {e}")))?;

        Ok(Self {
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a secret with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Fails only if the hasher rejects its own parameters.
    pub fn hash(&self, secret: &str) -> Result<Vec<u8>> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)
            .map_err(|e| QuillError::internal(format!("Salt encoding failed: {e}")))?;

        let hash = self
            .hasher
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| QuillError::internal(format!("Secret hashing failed: {e}")))?;

        Ok(hash.to_string().into_bytes())
    }

    /// Check a secret against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; only an unparseable hash is an error.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::CorruptHash` if `hash` is not a valid PHC string.
    pub fn verify(&self, secret: &str, hash: &[u8]) -> Result<bool> {
        let encoded = std::str::from_utf8(hash)
            .map_err(|e| QuillError::CorruptHash(format!("hash is not UTF-8: {e}")))?;
        let parsed = PasswordHash::new(encoded)?;

        match self.hasher.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(QuillError::CorruptHash(e.to_string())),
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager").finish_non_exhaustive()
    }
}
