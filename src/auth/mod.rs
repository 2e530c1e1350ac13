//! Sign-up, sign-in and sign-out against a hosted identity provider.
//!
//! The current principal is published through a `watch` channel owned by
//! [`Auth`]. Consumers get a receiver from [`Auth::subscribe`]; nothing reads
//! the signed-in user from global state.

mod firebase;

pub use firebase::FirebaseIdentity;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;

use crate::database::{Database, DatabaseError};
use crate::utils;

/// Minimum password length accepted by the provider
pub const MIN_PASSWORD_LEN: usize = 6;

/// Tokens this close to expiry are refreshed before use
const EXPIRY_SLACK_SECS: i64 = 60;

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SLACK_SECS) >= self.expires_at
    }
}

/// Snapshot of the authentication state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: Option<Principal>,
    /// True until the saved session has been restored (or found missing)
    pub loading: bool,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least 6 characters")]
    WeakPassword,
    #[error("An account with this email already exists")]
    EmailExists,
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("This account has been disabled")]
    UserDisabled,
    #[error("Too many attempts, try again later")]
    TooManyAttempts,
    #[error("Session expired, please sign in again")]
    SessionExpired,
    #[error("Identity provider error: {0}")]
    Provider(String),
    #[error("Network error: {0}")]
    Http(String),
    #[error("Session storage error: {0}")]
    Database(#[from] DatabaseError),
}

impl AuthError {
    /// Map a provider error code such as `EMAIL_EXISTS` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`
    pub fn from_provider_code(message: &str) -> Self {
        let code = message.split(':').next().unwrap_or(message).trim();
        match code {
            "EMAIL_EXISTS" => AuthError::EmailExists,
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
            "WEAK_PASSWORD" | "MISSING_PASSWORD" => AuthError::WeakPassword,
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                AuthError::InvalidCredentials
            }
            "USER_DISABLED" => AuthError::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
            "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
                AuthError::SessionExpired
            }
            _ => AuthError::Provider(message.to_string()),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError>;
    /// Exchange the refresh token for a new id token
    async fn refresh(&self, principal: &Principal) -> Result<Principal, AuthError>;
}

/// Reject credentials the provider would refuse anyway
pub fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if !utils::looks_like_email(email) {
        return Err(AuthError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

pub struct Auth {
    provider: Arc<dyn IdentityProvider>,
    sessions: Option<Mutex<Database>>,
    state: watch::Sender<AuthContext>,
}

impl Auth {
    /// `sessions` persists the signed-in principal between runs; pass `None`
    /// to keep the session in memory only.
    pub fn new(provider: Arc<dyn IdentityProvider>, sessions: Option<Database>) -> Self {
        let (state, _) = watch::channel(AuthContext {
            principal: None,
            loading: true,
        });
        Self {
            provider,
            sessions: sessions.map(Mutex::new),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthContext> {
        self.state.subscribe()
    }

    pub fn context(&self) -> AuthContext {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Principal> {
        self.state.borrow().principal.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    fn publish(&self, principal: Option<Principal>) {
        self.state.send_replace(AuthContext {
            principal,
            loading: false,
        });
    }

    fn with_sessions<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, DatabaseError>,
    ) -> Result<Option<T>, DatabaseError> {
        let Some(sessions) = &self.sessions else {
            return Ok(None);
        };
        match sessions.lock() {
            Ok(db) => f(&db).map(Some),
            Err(poisoned) => f(&poisoned.into_inner()).map(Some),
        }
    }

    fn persist(&self, principal: &Principal) {
        if let Err(e) = self.with_sessions(|db| db.save_session(principal)) {
            tracing::warn!("Failed to save session for {}: {}", principal.email, e);
        }
    }

    fn forget(&self) {
        if let Err(e) = self.with_sessions(|db| db.clear_session()) {
            tracing::warn!("Failed to clear saved session: {}", e);
        }
    }

    /// Load the saved session, refreshing it when the id token has expired.
    /// Always clears the loading flag.
    pub async fn restore(&self) -> Option<Principal> {
        let saved = match self.with_sessions(|db| db.load_session()) {
            Ok(saved) => saved.flatten(),
            Err(e) => {
                tracing::warn!("Failed to load saved session: {}", e);
                None
            }
        };

        let principal = match saved {
            Some(principal) if principal.is_expired(Utc::now()) => {
                match self.provider.refresh(&principal).await {
                    Ok(fresh) => {
                        self.persist(&fresh);
                        Some(fresh)
                    }
                    Err(e) => {
                        tracing::warn!("Saved session for {} could not be refreshed: {}", principal.email, e);
                        self.forget();
                        None
                    }
                }
            }
            other => other,
        };

        if let Some(principal) = &principal {
            tracing::info!("Restored session for {}", principal.email);
        }
        self.publish(principal.clone());
        principal
    }

    /// The current principal with an id token that is still valid.
    /// A failed refresh signs the user out.
    pub async fn ensure_fresh(&self) -> Option<Principal> {
        let principal = self.current()?;
        if !principal.is_expired(Utc::now()) {
            return Some(principal);
        }
        match self.provider.refresh(&principal).await {
            Ok(fresh) => {
                self.persist(&fresh);
                self.publish(Some(fresh.clone()));
                Some(fresh)
            }
            Err(e) => {
                tracing::error!("Error refreshing session for {}: {}", principal.email, e);
                self.sign_out();
                None
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let email = email.trim();
        let result = match validate_credentials(email, password) {
            Ok(()) => self.provider.sign_up(email, password).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(principal) => {
                tracing::info!("Signed up {}", principal.email);
                self.persist(&principal);
                self.publish(Some(principal.clone()));
                Ok(principal)
            }
            Err(e) => {
                tracing::error!("Error signing up: {}", e);
                Err(e)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let email = email.trim();
        let result = match validate_credentials(email, password) {
            Ok(()) => self.provider.sign_in(email, password).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(principal) => {
                tracing::info!("Signed in {}", principal.email);
                self.persist(&principal);
                self.publish(Some(principal.clone()));
                Ok(principal)
            }
            Err(e) => {
                tracing::error!("Error signing in: {}", e);
                Err(e)
            }
        }
    }

    pub fn sign_out(&self) {
        if let Some(principal) = self.current() {
            tracing::info!("Signed out {}", principal.email);
        }
        self.forget();
        self.publish(None);
    }
}
