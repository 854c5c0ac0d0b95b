//! Lock-guarded document store.
//!
//! Every operation runs one full cycle under the store lock: load the
//! snapshot, work on it in memory, and (for writers) persist it whole.
//! Writers hold the lock exclusively; readers share it. The lock only
//! serializes callers inside this process.

use crate::credential::CredentialManager;
use crate::error::{QuillError, Result};
use crate::jwt::RevocationLedger;
use crate::metrics::STORE_OPERATION_SECONDS;
use crate::store::backend::{FileBackend, SnapshotBackend};
use crate::store::snapshot::{Account, DocumentSnapshot, Post, RecordId, SnapshotStats};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::btree_map::Entry;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Posts, accounts and the revocation ledger behind one lock.
pub struct DocumentStore<B: SnapshotBackend = FileBackend> {
    backend: B,
    credentials: CredentialManager,
    lock: RwLock<()>,
}

impl DocumentStore<FileBackend> {
    /// Open the store at `path`, creating an empty snapshot file if none exists.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::Io` if the file cannot be created.
    pub fn open(path: impl Into<PathBuf>, credentials: CredentialManager) -> Result<Self> {
        Self::with_backend(FileBackend::new(path), credentials)
    }
}

impl<B: SnapshotBackend> DocumentStore<B> {
    /// Wrap an arbitrary backend, initializing it if empty.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if initialization fails.
    pub fn with_backend(backend: B, credentials: CredentialManager) -> Result<Self> {
        let store = Self {
            backend,
            credentials,
            lock: RwLock::new(()),
        };

        let created = {
            let _guard = store.lock.write();
            store.backend.initialize()?
        };
        if created {
            info!("Initialized empty document snapshot");
        } else {
            debug!("Using existing document snapshot");
        }

        Ok(store)
    }

    /// Backend this store persists through.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Credential manager used for account secrets.
    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Run `f` against a freshly loaded snapshot under a shared hold.
    pub(crate) fn read<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&DocumentSnapshot) -> Result<T>,
    ) -> Result<T> {
        let _timer = STORE_OPERATION_SECONDS
            .with_label_values(&[operation])
            .start_timer();
        let _guard = self.lock.read();
        let snapshot = self.backend.load()?;
        f(&snapshot)
    }

    /// Load, apply `f`, and persist, all under the exclusive hold.
    ///
    /// Nothing is persisted if `f` fails.
    pub(crate) fn mutate<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut DocumentSnapshot) -> Result<T>,
    ) -> Result<T> {
        let _timer = STORE_OPERATION_SECONDS
            .with_label_values(&[operation])
            .start_timer();
        let _guard = self.lock.write();
        let mut snapshot = self.backend.load()?;
        let output = f(&mut snapshot)?;
        self.backend.persist(&snapshot)?;
        Ok(output)
    }

    /// Store a new post. The body is taken as-is.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot cannot be loaded or persisted.
    pub fn create_post(&self, body: &str) -> Result<Post> {
        let post = self.mutate("create_post", |snapshot| {
            let post = Post {
                id: snapshot.next_post_id(),
                body: body.to_string(),
            };
            match snapshot.posts.entry(post.id) {
                Entry::Occupied(_) => Err(sparse_ids("post", post.id)),
                Entry::Vacant(slot) => Ok(slot.insert(post).clone()),
            }
        })?;

        info!(post_id = post.id, "Created post");
        Ok(post)
    }

    /// All posts in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot cannot be loaded.
    pub fn list_posts(&self) -> Result<Vec<Post>> {
        self.read("list_posts", |snapshot| {
            Ok(snapshot.posts.values().cloned().collect())
        })
    }

    /// A single post by id.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::NotFound` if no post has that id.
    pub fn get_post(&self, id: RecordId) -> Result<Post> {
        self.read("get_post", |snapshot| {
            snapshot
                .posts
                .get(&id)
                .cloned()
                .ok_or_else(|| QuillError::not_found("post"))
        })
    }

    /// Create an account with a unique email.
    ///
    /// Uniqueness is checked by a full scan inside the same critical section
    /// as the insert.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::DuplicateEmail` if the email is taken.
    pub fn create_account(&self, email: &str, secret: &str) -> Result<Account> {
        let secret_hash = self.credentials.hash(secret)?;

        let account = self.mutate("create_account", |snapshot| {
            if snapshot.account_by_email(email).is_some() {
                return Err(QuillError::DuplicateEmail {
                    email: email.to_string(),
                });
            }

            let account = Account {
                id: snapshot.next_account_id(),
                email: email.to_string(),
                secret_hash,
            };
            match snapshot.accounts.entry(account.id) {
                Entry::Occupied(_) => Err(sparse_ids("account", account.id)),
                Entry::Vacant(slot) => Ok(slot.insert(account).clone()),
            }
        })?;

        info!(account_id = account.id, "Created account");
        Ok(account)
    }

    /// Replace an account's email and secret.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::NotFound` if `id` is absent, or
    /// `QuillError::DuplicateEmail` if another account already uses `email`.
    pub fn update_account(&self, id: RecordId, email: &str, secret: &str) -> Result<Account> {
        let secret_hash = self.credentials.hash(secret)?;

        let account = self.mutate("update_account", |snapshot| {
            if !snapshot.accounts.contains_key(&id) {
                return Err(QuillError::not_found("account"));
            }
            if snapshot
                .account_by_email(email)
                .is_some_and(|other| other.id != id)
            {
                return Err(QuillError::DuplicateEmail {
                    email: email.to_string(),
                });
            }

            let account = snapshot
                .accounts
                .get_mut(&id)
                .ok_or_else(|| QuillError::not_found("account"))?;
            account.email = email.to_string();
            account.secret_hash = secret_hash;
            Ok(account.clone())
        })?;

        info!(account_id = account.id, "Updated account");
        Ok(account)
    }

    /// Find the account for `email` and check `secret` against it.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::NotFound` for an unknown email and
    /// `QuillError::InvalidCredential` when the secret does not verify.
    pub fn authenticate(&self, email: &str, secret: &str) -> Result<Account> {
        let account = self.read("authenticate", |snapshot| {
            snapshot
                .account_by_email(email)
                .cloned()
                .ok_or_else(|| QuillError::not_found("account"))
        })?;

        if self.credentials.verify(secret, &account.secret_hash)? {
            Ok(account)
        } else {
            warn!(account_id = account.id, "Secret did not verify");
            Err(QuillError::InvalidCredential)
        }
    }

    /// Upsert a token into the revocation ledger.
    ///
    /// Revoking a token again moves its timestamp to `when`; it never leaves
    /// the ledger.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot cannot be loaded or persisted.
    pub fn record_revocation(&self, token: &str, when: DateTime<Utc>) -> Result<()> {
        let previous = self.mutate("record_revocation", |snapshot| {
            Ok(snapshot.revocations.insert(token.to_string(), when))
        })?;

        if let Some(previous) = previous {
            debug!(previously_revoked_at = %previous, "Token was already revoked");
        }
        info!(revoked_at = %when, "Recorded token revocation");
        Ok(())
    }

    /// True iff this exact token string has been revoked.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot cannot be loaded.
    pub fn is_revoked(&self, token: &str) -> Result<bool> {
        self.read("is_revoked", |snapshot| {
            Ok(snapshot.revocations.contains_key(token))
        })
    }

    /// When `token` was revoked, if it was.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot cannot be loaded.
    pub fn revoked_at(&self, token: &str) -> Result<Option<DateTime<Utc>>> {
        self.read("revoked_at", |snapshot| {
            Ok(snapshot.revocations.get(token).copied())
        })
    }

    /// Table sizes.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot cannot be loaded.
    pub fn stats(&self) -> Result<SnapshotStats> {
        self.read("stats", |snapshot| Ok(snapshot.stats()))
    }
}

/// The next id is taken, so the snapshot has gaps or keys that disagree with
/// record ids. Refuse rather than overwrite.
fn sparse_ids(entity: &str, id: RecordId) -> QuillError {
    warn!(entity, id, "Next id already occupied");
    QuillError::internal(format!("snapshot {entity} ids are not dense: {id} is taken"))
}

impl<B: SnapshotBackend> RevocationLedger for DocumentStore<B> {
    fn is_revoked(&self, token: &str) -> Result<bool> {
        Self::is_revoked(self, token)
    }
}

impl<B: SnapshotBackend + std::fmt::Debug> std::fmt::Debug for DocumentStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
