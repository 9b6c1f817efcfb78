//! Identity provider port
//!
//! The controller only needs two things from an identity provider: a way to
//! sign out any persisted session, and a subscription to authentication state.
//! `InMemoryIdentityProvider` implements both locally with email/password
//! accounts; hosted providers plug in through the same trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::{broadcast, Notify};

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authenticated user reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque user identifier
    pub uid: String,
    /// Display name
    pub display_name: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Profile photo URL
    pub photo_url: Option<String>,
}

impl Identity {
    /// Create an identity with only a user id
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    /// Builder: set the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Builder: set the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Builder: set the photo URL
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}

/// Errors reported by an identity provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A required form field was empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Email is not well formed
    #[error("Invalid email address")]
    InvalidEmail,

    /// Password shorter than `MIN_PASSWORD_LEN`
    #[error("Password is too weak")]
    WeakPassword,

    /// An account already uses this email
    #[error("Email already in use")]
    EmailAlreadyInUse,

    /// No account for this email
    #[error("User not found")]
    UserNotFound,

    /// Password does not match
    #[error("Wrong password")]
    WrongPassword,

    /// Account has been disabled
    #[error("User disabled")]
    UserDisabled,

    /// Provider could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// Any other provider failure
    #[error("Provider error: {0}")]
    Provider(String),
}

impl AuthError {
    /// Message suitable for showing on the login and register screens
    pub fn user_message(&self) -> String {
        match self {
            AuthError::MissingField(_) => "Todos los campos son obligatorios".to_string(),
            AuthError::InvalidEmail => "El formato del correo electrónico no es válido".to_string(),
            AuthError::WeakPassword => format!(
                "La contraseña debe tener al menos {} caracteres",
                MIN_PASSWORD_LEN
            ),
            AuthError::EmailAlreadyInUse => {
                "Ya existe una cuenta con este correo electrónico".to_string()
            }
            AuthError::UserNotFound => "No existe una cuenta con este correo electrónico".to_string(),
            AuthError::WrongPassword => "Contraseña incorrecta".to_string(),
            AuthError::UserDisabled => "Esta cuenta ha sido deshabilitada".to_string(),
            AuthError::Network(_) => "Error de conexión. Verifica tu internet".to_string(),
            AuthError::Provider(detail) => format!("Error desconocido ({})", detail),
        }
    }
}

/// One authentication-state event
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// A user is signed in
    SignedIn(Identity),
    /// No user is signed in
    SignedOut,
    /// The stream failed and will deliver nothing more
    Failed(String),
}

impl From<Option<Identity>> for AuthEvent {
    fn from(user: Option<Identity>) -> Self {
        match user {
            Some(identity) => AuthEvent::SignedIn(identity),
            None => AuthEvent::SignedOut,
        }
    }
}

/// Live subscription to authentication state
///
/// Yields the provider's state at subscription time first, then every later
/// change in delivery order. Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct AuthSubscription {
    pending: Option<AuthEvent>,
    events: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Create a subscription replaying `initial` before live `events`
    pub fn new(initial: Option<AuthEvent>, events: broadcast::Receiver<AuthEvent>) -> Self {
        Self {
            pending: initial,
            events,
        }
    }

    /// Next event, or `None` once the provider is gone
    ///
    /// Cancel safe: no event is lost if the future is dropped before it
    /// completes.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }

        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Auth subscription lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Source of authentication state
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign out whatever session the provider persisted
    async fn force_sign_out(&self) -> Result<(), AuthError>;

    /// Subscribe to authentication state
    fn subscribe(&self) -> AuthSubscription;
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: Identity,
    disabled: bool,
}

/// Local identity provider with email/password accounts
///
/// Used by the demo binary and tests. Also exposes hooks to delay or fail the
/// forced sign-out and to fail the state stream.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<Identity>>,
    events: broadcast::Sender<AuthEvent>,
    sign_out_gate: Mutex<Option<Arc<Notify>>>,
    fail_next_sign_out: AtomicBool,
    sign_out_calls: AtomicUsize,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    /// Create a provider with no accounts and no session
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            events,
            sign_out_gate: Mutex::new(None),
            fail_next_sign_out: AtomicBool::new(false),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    /// Create an account and sign it in
    pub fn register(&self, display_name: &str, email: &str, password: &str) -> Result<Identity, AuthError> {
        let display_name = display_name.trim();
        let email = normalize_email(email);
        if display_name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        if email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let identity = {
            let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailAlreadyInUse);
            }

            let identity = Identity::new(uuid::Uuid::new_v4().to_string())
                .with_display_name(display_name)
                .with_email(email.clone());
            accounts.insert(
                email,
                Account {
                    password: password.to_string(),
                    identity: identity.clone(),
                    disabled: false,
                },
            );
            identity
        };

        tracing::info!("Registered account {}", identity.uid);
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    /// Sign in with email and password
    pub fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }

        let identity = {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            let account = accounts.get(&email).ok_or(AuthError::UserNotFound)?;
            if account.disabled {
                return Err(AuthError::UserDisabled);
            }
            if account.password != password {
                return Err(AuthError::WrongPassword);
            }
            account.identity.clone()
        };

        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    /// User-initiated sign out
    pub fn sign_out(&self) {
        self.set_current(None);
    }

    /// Disable an account; the next sign-in with it fails
    pub fn disable_account(&self, email: &str) -> Result<(), AuthError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let account = accounts
            .get_mut(&normalize_email(email))
            .ok_or(AuthError::UserNotFound)?;
        account.disabled = true;
        Ok(())
    }

    /// Install a session as if persisted by a previous run, without an event
    pub fn restore_session(&self, identity: Identity) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    /// Currently signed-in user
    pub fn current_user(&self) -> Option<Identity> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Deliver a terminal failure to every subscriber
    pub fn fail_stream(&self, reason: impl Into<String>) {
        let _ = self.events.send(AuthEvent::Failed(reason.into()));
    }

    /// Make the next forced sign-out fail
    pub fn fail_next_sign_out(&self) {
        self.fail_next_sign_out.store(true, Ordering::SeqCst);
    }

    /// Hold every forced sign-out until the returned handle is notified
    pub fn hold_sign_out(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.sign_out_gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&gate));
        gate
    }

    /// How many forced sign-outs were requested
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn set_current(&self, user: Option<Identity>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = user.clone();
        // No receivers is not an error: nobody is listening yet.
        let _ = self.events.send(AuthEvent::from(user));
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn force_sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self
            .sign_out_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_next_sign_out.swap(false, Ordering::SeqCst) {
            return Err(AuthError::Network("sign-out request failed".to_string()));
        }

        self.set_current(None);
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        // Subscribe before reading the snapshot so no change falls in between.
        let events = self.events.subscribe();
        let initial = AuthEvent::from(self.current_user());
        AuthSubscription::new(Some(initial), events)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
