//! Account sessions over the document store.
//!
//! `SessionService` is the owned process state a transport layer holds: the
//! store, the token issuer and validator sharing one signing key, and the
//! clock every expiry decision is made against.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::content;
use crate::credential::CredentialManager;
use crate::error::{QuillError, Result};
use crate::jwt::{TokenIssuer, TokenKind, TokenValidator};
use crate::metrics;
use crate::store::{Account, DocumentStore, FileBackend, Post, RecordId, SnapshotBackend};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Tokens handed out on a successful login.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    /// The authenticated account
    pub account: Account,
    /// Short-lived token for resource-modifying requests
    pub access_token: String,
    /// Long-lived token for minting access tokens
    pub refresh_token: String,
}

/// Store, token issuer, validator and clock wired together.
pub struct SessionService<B: SnapshotBackend = FileBackend> {
    store: Arc<DocumentStore<B>>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    clock: Arc<dyn Clock>,
}

impl SessionService<FileBackend> {
    /// Open the configured store and build a service on the wall clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the hash parameters are invalid or the store file
    /// cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = CredentialManager::new(config.hash_params)?;
        let store = Arc::new(DocumentStore::open(config.database_path.clone(), credentials)?);
        let issuer = TokenIssuer::new(
            &config.jwt_secret,
            config.access_expiry,
            config.refresh_token_ttl,
        );
        let validator = TokenValidator::new(&config.jwt_secret);

        Ok(Self::new(store, issuer, validator, Arc::new(SystemClock)))
    }
}

impl<B: SnapshotBackend> SessionService<B> {
    /// Wire an already opened store to an issuer, validator and clock.
    ///
    /// `issuer` and `validator` must share a signing key.
    pub fn new(
        store: Arc<DocumentStore<B>>,
        issuer: TokenIssuer,
        validator: TokenValidator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            issuer,
            validator,
            clock,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<DocumentStore<B>> {
        &self.store
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::DuplicateEmail` if the email is taken.
    #[instrument(skip(self, secret))]
    pub fn register(&self, email: &str, secret: &str) -> Result<Account> {
        self.store.create_account(email, secret)
    }

    /// Check credentials and issue an access/refresh pair.
    ///
    /// `requested_access_ttl` only matters under a capped access policy.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::NotFound` for an unknown email or
    /// `QuillError::InvalidCredential` for a wrong secret.
    #[instrument(skip(self, secret))]
    pub fn login(
        &self,
        email: &str,
        secret: &str,
        requested_access_ttl: Option<Duration>,
    ) -> Result<LoginGrant> {
        let account = self
            .store
            .authenticate(email, secret)
            .inspect_err(|e| {
                if matches!(e, QuillError::NotFound { .. } | QuillError::InvalidCredential) {
                    metrics::record_auth_failure(QuillError::InvalidCredential.code().as_str());
                }
            })?;

        let now = self.clock.now();
        let access_token = self
            .issuer
            .issue_access_with_ttl(account.id, now, requested_access_ttl)?;
        let refresh_token = self.issuer.issue_refresh(account.id, now)?;

        info!(account_id = account.id, "Login succeeded");
        Ok(LoginGrant {
            account,
            access_token,
            refresh_token,
        })
    }

    /// Resolve an access token header to the caller's account id.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the header or token is rejected.
    #[instrument(skip_all)]
    pub fn authorize(&self, header: &str) -> Result<RecordId> {
        self.validator
            .validate(header, TokenKind::Access, self.clock.now(), &*self.store)
            .inspect_err(note_rejection)
    }

    /// Change the caller's own email and secret.
    ///
    /// # Errors
    ///
    /// Returns an authentication error for a bad access token,
    /// `QuillError::NotFound` if the subject no longer exists, or
    /// `QuillError::DuplicateEmail` if another account uses `email`.
    #[instrument(skip(self, header, secret))]
    pub fn update_account(&self, header: &str, email: &str, secret: &str) -> Result<Account> {
        let account_id = self.authorize(header)?;
        self.store.update_account(account_id, email, secret)
    }

    /// Mint a new access token from a live refresh token.
    ///
    /// The refresh token itself is not rotated.
    ///
    /// # Errors
    ///
    /// Returns an authentication error, including `QuillError::Revoked`.
    #[instrument(skip_all)]
    pub fn refresh(&self, header: &str) -> Result<String> {
        let now = self.clock.now();
        let result = self
            .validator
            .validate(header, TokenKind::Refresh, now, &*self.store)
            .and_then(|account_id| self.issuer.issue_access(account_id, now));

        metrics::record_refresh(result.is_ok());
        result.inspect_err(note_rejection)
    }

    /// Put a refresh token on the revocation ledger.
    ///
    /// Revoking an already revoked token again refreshes its recorded
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the token is not a valid refresh
    /// token, or a storage error if the ledger cannot be written.
    #[instrument(skip_all)]
    pub fn revoke(&self, header: &str) -> Result<()> {
        let now = self.clock.now();
        let token = self
            .validator
            .verify_header(header, TokenKind::Refresh, now)
            .inspect_err(note_rejection)?;

        self.store.record_revocation(token.raw(), now)?;
        metrics::TOKENS_REVOKED.inc();
        Ok(())
    }

    /// Apply body rules and store the post.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::InvalidBody` for an over-long body.
    #[instrument(skip_all)]
    pub fn publish_post(&self, body: &str) -> Result<Post> {
        let body = content::prepare_body(body)?;
        self.store.create_post(&body)
    }

    /// All posts in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot cannot be loaded.
    pub fn posts(&self) -> Result<Vec<Post>> {
        self.store.list_posts()
    }

    /// One post by id.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::NotFound` if absent.
    pub fn post(&self, id: RecordId) -> Result<Post> {
        self.store.get_post(id)
    }
}

fn note_rejection(err: &QuillError) {
    if err.is_auth_failure() {
        let reason = err.code().as_str();
        metrics::record_auth_failure(reason);
        warn!(reason, "Token rejected");
    }
}

impl<B: SnapshotBackend> std::fmt::Debug for SessionService<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::credential::HashParams;
    use crate::jwt::AccessExpiry;
    use crate::jwt::issuer::{DEFAULT_REFRESH_TTL, MAX_ACCESS_TTL};
    use crate::store::MemoryBackend;
    use chrono::{DateTime, Utc};
    use secrecy::SecretString;

    const SECRET: &str = "session-test-secret-that-is-32-bytes!";

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn service(expiry: AccessExpiry) -> (SessionService<MemoryBackend>, Arc<ManualClock>) {
        let credentials = CredentialManager::new(HashParams {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let store = DocumentStore::with_backend(MemoryBackend::new(), credentials).unwrap();
        let store = Arc::new(store);
        let secret = SecretString::from(SECRET.to_string());
        let clock = Arc::new(ManualClock::new(start()));

        let service = SessionService::new(
            store,
            TokenIssuer::new(&secret, expiry, DEFAULT_REFRESH_TTL),
            TokenValidator::new(&secret),
            clock.clone(),
        );
        (service, clock)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[test]
    fn test_login_then_authorize() {
        let (service, _clock) = service(AccessExpiry::default());
        let account = service.register("a@x.com", "pw").unwrap();

        let grant = service.login("a@x.com", "pw", None).unwrap();
        assert_eq!(grant.account.id, account.id);
        assert_eq!(service.authorize(&bearer(&grant.access_token)).unwrap(), account.id);
    }

    #[test]
    fn test_login_failures() {
        let (service, _clock) = service(AccessExpiry::default());
        service.register("a@x.com", "pw").unwrap();

        assert!(matches!(
            service.login("a@x.com", "nope", None),
            Err(QuillError::InvalidCredential)
        ));
        assert!(matches!(service.login("b@x.com", "pw", None), Err(QuillError::NotFound { .. })));
    }

    #[test]
    fn test_refresh_token_cannot_authorize() {
        let (service, _clock) = service(AccessExpiry::default());
        service.register("a@x.com", "pw").unwrap();
        let grant = service.login("a@x.com", "pw", None).unwrap();

        assert!(matches!(
            service.authorize(&bearer(&grant.refresh_token)),
            Err(QuillError::WrongTokenType { .. })
        ));
        assert!(matches!(
            service.refresh(&bearer(&grant.access_token)),
            Err(QuillError::WrongTokenType { .. })
        ));
    }

    #[test]
    fn test_access_expires_after_an_hour() {
        let (service, clock) = service(AccessExpiry::default());
        service.register("a@x.com", "pw").unwrap();
        let grant = service.login("a@x.com", "pw", None).unwrap();

        clock.advance(chrono::Duration::minutes(59));
        assert!(service.authorize(&bearer(&grant.access_token)).is_ok());

        clock.advance(chrono::Duration::minutes(1));
        assert!(matches!(
            service.authorize(&bearer(&grant.access_token)),
            Err(QuillError::Expired { .. })
        ));
    }

    #[test]
    fn test_capped_policy_honours_request() {
        let (service, clock) = service(AccessExpiry::Capped {
            default: Duration::from_secs(3600),
            max: MAX_ACCESS_TTL,
        });
        service.register("a@x.com", "pw").unwrap();
        let grant = service
            .login("a@x.com", "pw", Some(Duration::from_secs(6 * 3600)))
            .unwrap();

        clock.advance(chrono::Duration::hours(5));
        assert!(service.authorize(&bearer(&grant.access_token)).is_ok());
    }

    #[test]
    fn test_fixed_policy_ignores_request() {
        let (service, clock) = service(AccessExpiry::default());
        service.register("a@x.com", "pw").unwrap();
        let grant = service
            .login("a@x.com", "pw", Some(Duration::from_secs(6 * 3600)))
            .unwrap();

        clock.advance(chrono::Duration::hours(2));
        assert!(service.authorize(&bearer(&grant.access_token)).is_err());
    }

    #[test]
    fn test_revoke_blocks_refresh_but_not_access() {
        let (service, _clock) = service(AccessExpiry::default());
        service.register("a@x.com", "pw").unwrap();
        let grant = service.login("a@x.com", "pw", None).unwrap();
        let refresh = bearer(&grant.refresh_token);

        let access = service.refresh(&refresh).unwrap();
        service.revoke(&refresh).unwrap();

        assert!(matches!(service.refresh(&refresh), Err(QuillError::Revoked)));
        assert!(service.authorize(&bearer(&access)).is_ok());
    }

    #[test]
    fn test_revoke_twice_records_latest_timestamp() {
        let (service, clock) = service(AccessExpiry::default());
        service.register("a@x.com", "pw").unwrap();
        let grant = service.login("a@x.com", "pw", None).unwrap();
        let refresh = bearer(&grant.refresh_token);

        service.revoke(&refresh).unwrap();
        clock.advance(chrono::Duration::minutes(5));
        service.revoke(&refresh).unwrap();

        assert_eq!(
            service.store().revoked_at(&grant.refresh_token).unwrap(),
            Some(start() + chrono::Duration::minutes(5))
        );
        assert!(matches!(service.refresh(&refresh), Err(QuillError::Revoked)));
    }

    #[test]
    fn test_revoke_rejects_access_token() {
        let (service, _clock) = service(AccessExpiry::default());
        service.register("a@x.com", "pw").unwrap();
        let grant = service.login("a@x.com", "pw", None).unwrap();

        assert!(matches!(
            service.revoke(&bearer(&grant.access_token)),
            Err(QuillError::WrongTokenType { .. })
        ));
        assert_eq!(service.store().stats().unwrap().revocations, 0);
    }

    #[test]
    fn test_update_account_acts_on_subject() {
        let (service, _clock) = service(AccessExpiry::default());
        service.register("a@x.com", "pw").unwrap();
        service.register("b@x.com", "pw").unwrap();
        let grant = service.login("a@x.com", "pw", None).unwrap();
        let header = bearer(&grant.access_token);

        let updated = service.update_account(&header, "c@x.com", "new").unwrap();
        assert_eq!(updated.id, grant.account.id);
        assert!(service.login("c@x.com", "new", None).is_ok());
        assert!(matches!(service.login("a@x.com", "pw", None), Err(QuillError::NotFound { .. })));

        assert!(matches!(
            service.update_account(&header, "b@x.com", "x"),
            Err(QuillError::DuplicateEmail { .. })
        ));
    }

    #[test]
    fn test_malformed_header() {
        let (service, _clock) = service(AccessExpiry::default());
        assert!(matches!(service.authorize("Bearer"), Err(QuillError::MalformedHeader)));
        assert!(matches!(service.refresh("garbage"), Err(QuillError::MalformedHeader)));
    }

    #[test]
    fn test_publish_post_applies_body_rules() {
        let (service, _clock) = service(AccessExpiry::default());

        let post = service.publish_post("what a kerfuffle").unwrap();
        assert_eq!(post.body, "what a ****");
        assert_eq!(service.post(post.id).unwrap(), post);
        assert_eq!(service.posts().unwrap(), vec![post]);

        assert!(matches!(
            service.publish_post(&"x".repeat(141)),
            Err(QuillError::InvalidBody { .. })
        ));
        assert_eq!(service.posts().unwrap().len(), 1);
    }
}
