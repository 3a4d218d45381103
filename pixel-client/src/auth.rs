//! Authentication collaborator.
//!
//! The session controller only needs to know who is signed in and when that
//! changes. [`AuthProvider`] is that interface; [`LocalAuth`] is an
//! in-process provider for local deployments and tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Consecutive failed sign-ins before an account is locked.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// How long a locked account refuses sign-in.
pub const LOCKOUT: Duration = Duration::from_secs(60);

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Stable account id.
    pub uid: String,
    /// Account email.
    pub email: String,
}

/// Authentication failures. `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Email or password left blank.
    #[error("Please enter email and password")]
    MissingCredentials,
    /// Sign-up with an email that already has an account.
    #[error("Email is already registered")]
    EmailInUse,
    /// Password shorter than [`MIN_PASSWORD_LEN`].
    #[error("Password is too weak (min 6 characters)")]
    WeakPassword,
    /// Malformed email address.
    #[error("Invalid email address")]
    InvalidEmail,
    /// Sign-in for an unknown email.
    #[error("No user found with this email")]
    UserNotFound,
    /// Sign-in with the wrong password.
    #[error("Incorrect password")]
    WrongPassword,
    /// The provider could not be reached.
    #[error("Network error - check your connection")]
    Network,
    /// Too many consecutive failures.
    #[error("Too many failed attempts. Try again later")]
    TooManyRequests,
    /// Any other provider error, shown as-is.
    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// Map a provider error code such as `auth/wrong-password`.
    ///
    /// Unknown codes become [`AuthError::Other`] carrying `fallback`.
    #[must_use]
    pub fn from_code(code: &str, fallback: impl Into<String>) -> Self {
        match code.trim_start_matches("auth/") {
            "email-already-in-use" => Self::EmailInUse,
            "weak-password" => Self::WeakPassword,
            "invalid-email" => Self::InvalidEmail,
            "user-not-found" => Self::UserNotFound,
            "wrong-password" => Self::WrongPassword,
            "network-request-failed" => Self::Network,
            "too-many-requests" => Self::TooManyRequests,
            "missing-credentials" => Self::MissingCredentials,
            _ => Self::Other(fallback.into()),
        }
    }
}

/// Identity provider consumed by the session controller.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Sign in to an existing account.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Sign out the current user.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Currently signed-in identity.
    fn current(&self) -> Option<Identity>;

    /// Feed of identity changes, `None` when signed out.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;
}

#[derive(Debug)]
struct Account {
    uid: String,
    password: String,
    failed_attempts: u32,
    locked_until: Option<Instant>,
}

/// In-process account registry.
///
/// Credentials live in memory for the lifetime of the value.
#[derive(Debug)]
pub struct LocalAuth {
    accounts: Mutex<HashMap<String, Account>>,
    current: watch::Sender<Option<Identity>>,
}

impl Default for LocalAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalAuth {
    /// Create an empty registry with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            current,
        }
    }

    fn publish(&self, identity: Option<Identity>) {
        self.current.send_replace(identity);
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

fn check_credentials(email: &str, password: &str) -> Result<String, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    if !is_valid_email(&email) {
        return Err(AuthError::InvalidEmail);
    }
    Ok(email)
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = check_credentials(email, password)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let identity = {
            let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailInUse);
            }
            let uid = Uuid::new_v4().to_string();
            accounts.insert(
                email.clone(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                    failed_attempts: 0,
                    locked_until: None,
                },
            );
            Identity { uid, email }
        };

        tracing::info!(email = %identity.email, "Account created");
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = check_credentials(email, password)?;

        let identity = {
            let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            let account = accounts.get_mut(&email).ok_or(AuthError::UserNotFound)?;

            let now = Instant::now();
            if account.locked_until.is_some_and(|until| now < until) {
                return Err(AuthError::TooManyRequests);
            }
            if account.password != password {
                account.failed_attempts += 1;
                if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
                    account.failed_attempts = 0;
                    account.locked_until = Some(now + LOCKOUT);
                    tracing::warn!(%email, "Account locked after repeated failures");
                    return Err(AuthError::TooManyRequests);
                }
                return Err(AuthError::WrongPassword);
            }
            account.failed_attempts = 0;
            account.locked_until = None;
            Identity {
                uid: account.uid.clone(),
                email,
            }
        };

        tracing::info!(email = %identity.email, "Signed in");
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.current.borrow().is_some() {
            tracing::info!("Signed out");
        }
        self.publish(None);
        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}
