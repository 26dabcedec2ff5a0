// service/identity.rs
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::db::document::{encode, DocumentStore, StoreError};
use crate::utils::password;

pub const ACCOUNTS: &str = "accounts";
pub const MIN_PASSWORD_LENGTH: usize = 6;
const IDENTITY_EVENT_CAPACITY: usize = 64;

const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    SignedIn(Identity),
    SignedOut(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth/invalid-email")]
    InvalidEmail,

    #[error("auth/email-already-in-use")]
    EmailAlreadyInUse,

    #[error("auth/weak-password")]
    WeakPassword,

    #[error("auth/wrong-password")]
    WrongCredentials,

    #[error("auth/user-not-found")]
    UserNotFound,

    #[error("auth/user-disabled")]
    UserDisabled,

    #[error("auth/internal-error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidEmail => "auth/invalid-email",
            AuthError::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthError::WeakPassword => "auth/weak-password",
            AuthError::WrongCredentials => "auth/wrong-password",
            AuthError::UserNotFound => "auth/user-not-found",
            AuthError::UserDisabled => "auth/user-disabled",
            AuthError::Internal(_) => "auth/internal-error",
        }
    }

    /// Message shown to people; raw provider errors never reach them.
    pub fn user_message(&self) -> &'static str {
        message_for_code(self.code())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// Static code -> message lookup for identity provider errors.
pub fn message_for_code(code: &str) -> &'static str {
    match code {
        "auth/invalid-email" => "Please enter a valid email address.",
        "auth/email-already-in-use" => "An account with this email already exists.",
        "auth/weak-password" => "Password must be at least 6 characters.",
        "auth/wrong-password" | "auth/invalid-credential" => "Incorrect email or password.",
        "auth/user-not-found" => "No account found with this email.",
        "auth/user-disabled" => "This account has been disabled.",
        "auth/too-many-requests" => "Too many attempts. Please try again later.",
        _ => FALLBACK_MESSAGE,
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + Debug {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self, user_id: &str) -> Result<(), AuthError>;

    /// Removes the account registered under `email`.
    async fn delete_account(&self, email: &str) -> Result<(), AuthError>;

    fn identity_changes(&self) -> broadcast::Receiver<IdentityEvent>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Account {
    #[serde(default)]
    id: String,
    user_id: String,
    password_hash: String,
    #[serde(default)]
    disabled: bool,
    created_at: i64,
}

/// Identity provider keeping accounts in the document store, keyed by the
/// normalized email so duplicate registrations collide atomically.
#[derive(Debug)]
pub struct LocalIdentityProvider {
    store: Arc<dyn DocumentStore>,
    events: broadcast::Sender<IdentityEvent>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl LocalIdentityProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (events, _) = broadcast::channel(IDENTITY_EVENT_CAPACITY);
        LocalIdentityProvider { store, events }
    }

    fn emit(&self, event: IdentityEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("No listener for identity events");
        }
    }

    async fn account(&self, email: &str) -> Result<Account, AuthError> {
        self.store
            .get(ACCOUNTS, email)
            .await?
            .ok_or(AuthError::UserNotFound)?
            .decode()
            .map_err(AuthError::from)
    }

    /// Blocks or unblocks sign-in for an account.
    pub async fn set_disabled(&self, email: &str, disabled: bool) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let mut patch = serde_json::Map::new();
        patch.insert("disabled".to_string(), json!(disabled));
        match self.store.update(ACCOUNTS, &email, patch).await {
            Err(StoreError::NotFound { .. }) => Err(AuthError::UserNotFound),
            other => other.map_err(AuthError::from),
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email);
        if !validator::validate_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }

        let password_hash =
            password::hash(password).map_err(|e| AuthError::Internal(e.to_string()))?;
        let account = Account {
            id: String::new(),
            user_id: Uuid::new_v4().to_string(),
            password_hash,
            disabled: false,
            created_at: Utc::now().timestamp_millis(),
        };

        match self.store.create(ACCOUNTS, &email, encode(&account)?).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => return Err(AuthError::EmailAlreadyInUse),
            Err(e) => return Err(e.into()),
        }

        let identity = Identity {
            user_id: account.user_id,
            email,
        };
        tracing::info!("Created account {}", identity.user_id);
        self.emit(IdentityEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email);
        if !validator::validate_email(&email) {
            return Err(AuthError::InvalidEmail);
        }

        let account = self.account(&email).await?;
        if account.disabled {
            return Err(AuthError::UserDisabled);
        }

        let matched = password::compare(password, &account.password_hash)
            .map_err(|_| AuthError::WrongCredentials)?;
        if !matched {
            return Err(AuthError::WrongCredentials);
        }

        let identity = Identity {
            user_id: account.user_id,
            email,
        };
        self.emit(IdentityEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self, user_id: &str) -> Result<(), AuthError> {
        self.emit(IdentityEvent::SignedOut(user_id.to_string()));
        Ok(())
    }

    async fn delete_account(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        match self.store.delete(ACCOUNTS, &email).await {
            Err(StoreError::NotFound { .. }) => Err(AuthError::UserNotFound),
            other => other.map_err(AuthError::from),
        }?;
        tracing::info!("Deleted account {}", email);
        Ok(())
    }

    fn identity_changes(&self) -> broadcast::Receiver<IdentityEvent> {
        self.events.subscribe()
    }
}

/// Logs every identity change until the provider goes away.
pub async fn log_identity_events(mut events: broadcast::Receiver<IdentityEvent>) {
    loop {
        match events.recv().await {
            Ok(IdentityEvent::SignedIn(identity)) => {
                tracing::info!("User {} signed in as {}", identity.user_id, identity.email);
            }
            Ok(IdentityEvent::SignedOut(user_id)) => {
                tracing::info!("User {} signed out", user_id);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Identity event log skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    fn provider() -> LocalIdentityProvider {
        LocalIdentityProvider::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_then_sign_in() {
        let provider = provider();
        let created = provider.create_account("Ada@Example.com ", "secret1").await.unwrap();
        assert_eq!(created.email, "ada@example.com");

        let signed_in = provider.sign_in("ada@example.com", "secret1").await.unwrap();
        assert_eq!(signed_in, created);
    }

    #[tokio::test]
    async fn test_registration_errors() {
        let provider = provider();
        provider.create_account("ada@example.com", "secret1").await.unwrap();

        let err = provider.create_account("ADA@example.com", "secret2").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailAlreadyInUse));

        let err = provider.create_account("not-an-email", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail));

        let err = provider.create_account("obi@example.com", "123").await.unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword));
    }

    #[tokio::test]
    async fn test_sign_in_errors() {
        let provider = provider();
        provider.create_account("ada@example.com", "secret1").await.unwrap();

        let err = provider.sign_in("ada@example.com", "wrong-one").await.unwrap_err();
        assert!(matches!(err, AuthError::WrongCredentials));

        let err = provider.sign_in("obi@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));

        provider.set_disabled("ada@example.com", true).await.unwrap();
        let err = provider.sign_in("ada@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::UserDisabled));
    }

    #[tokio::test]
    async fn test_deleted_account_frees_the_email() {
        let provider = provider();
        let first = provider.create_account("ada@example.com", "secret1").await.unwrap();

        provider.delete_account("ADA@example.com").await.unwrap();
        assert!(matches!(
            provider.sign_in("ada@example.com", "secret1").await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            provider.delete_account("ada@example.com").await,
            Err(AuthError::UserNotFound)
        ));

        let second = provider.create_account("ada@example.com", "secret2").await.unwrap();
        assert_ne!(first.user_id, second.user_id);
    }

    #[tokio::test]
    async fn test_identity_events_are_broadcast() {
        let provider = provider();
        let mut events = provider.identity_changes();

        let identity = provider.create_account("ada@example.com", "secret1").await.unwrap();
        assert_eq!(events.recv().await.unwrap(), IdentityEvent::SignedIn(identity.clone()));

        provider.sign_out(&identity.user_id).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            IdentityEvent::SignedOut(identity.user_id)
        );
    }

    #[tokio::test]
    async fn test_event_log_ends_with_the_provider() {
        let provider = provider();
        let logger = tokio::spawn(log_identity_events(provider.identity_changes()));

        provider.create_account("ada@example.com", "secret1").await.unwrap();
        drop(provider);

        tokio::time::timeout(std::time::Duration::from_secs(1), logger)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_every_error_has_a_human_message() {
        for err in [
            AuthError::InvalidEmail,
            AuthError::EmailAlreadyInUse,
            AuthError::WeakPassword,
            AuthError::WrongCredentials,
            AuthError::UserNotFound,
            AuthError::UserDisabled,
        ] {
            assert_ne!(err.user_message(), FALLBACK_MESSAGE, "{}", err.code());
        }
        assert_eq!(
            AuthError::Internal("pool timed out".to_string()).user_message(),
            FALLBACK_MESSAGE
        );
        assert_eq!(message_for_code("auth/unknown"), FALLBACK_MESSAGE);
    }
}
