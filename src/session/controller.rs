//! Authentication session controller
//!
//! Turns an identity provider's state stream into the three-state session
//! signal the navigation layer consumes:
//!
//! ```text
//! initializing ──► anonymous ◄──► authenticated(user)
//!        └───────────────────────────►┘
//! ```
//!
//! On start the controller first forces a sign-out of any persisted session
//! (when the launch policy asks for it) and only then subscribes. Stream
//! events delivered before that clear completes are never observed.

use crate::session::identity::{AuthEvent, Identity, IdentityProvider};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Session lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    /// Waiting for the first authentication event
    #[default]
    Initializing,
    /// No user signed in
    Anonymous,
    /// A user is signed in
    Authenticated(Identity),
}

/// Status part of a session, without the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Waiting for the first authentication event
    Initializing,
    /// No user signed in
    Anonymous,
    /// A user is signed in
    Authenticated,
}

impl Session {
    /// Status of this session
    pub fn status(&self) -> SessionStatus {
        match self {
            Session::Initializing => SessionStatus::Initializing,
            Session::Anonymous => SessionStatus::Anonymous,
            Session::Authenticated(_) => SessionStatus::Authenticated,
        }
    }

    /// Signed-in user, if any
    pub fn user(&self) -> Option<&Identity> {
        match self {
            Session::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Whether the first authentication event has been processed
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Session::Initializing)
    }
}

/// Launch behavior of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Force a sign-out before subscribing, so every cold start needs a fresh login
    pub clear_session_on_launch: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            clear_session_on_launch: true,
        }
    }
}

/// Read-only handle to the session state
///
/// Cloning creates another subscriber; dropping a handle unsubscribes it.
#[derive(Debug, Clone)]
pub struct SessionSignal {
    rx: watch::Receiver<Session>,
}

impl SessionSignal {
    /// Current session
    pub fn current(&self) -> Session {
        self.rx.borrow().clone()
    }

    /// Wait for the next change
    ///
    /// Returns `None` once the controller is gone.
    pub async fn changed(&mut self) -> Option<Session> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the session leaves `Initializing`
    ///
    /// If the controller stops first, the last published session is returned.
    pub async fn wait_until_resolved(&mut self) -> Session {
        let resolved = self
            .rx
            .wait_for(Session::is_resolved)
            .await
            .map(|session| session.clone());

        match resolved {
            Ok(session) => session,
            Err(_) => self.rx.borrow().clone(),
        }
    }
}

/// Owns the authentication subscription and publishes the session
///
/// Exactly one subscription is held per controller. It is released once,
/// when the controller is torn down (`shutdown`, `teardown`, or drop).
#[derive(Debug)]
pub struct AuthSessionController {
    session: watch::Receiver<Session>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AuthSessionController {
    /// Start the controller on the current tokio runtime
    pub fn start(provider: Arc<dyn IdentityProvider>, policy: SessionPolicy) -> Self {
        let (tx, rx) = watch::channel(Session::Initializing);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(provider, policy, tx, cancel.clone()));

        Self {
            session: rx,
            cancel,
            task: Some(task),
        }
    }

    /// New handle to the session signal
    pub fn subscribe(&self) -> SessionSignal {
        SessionSignal {
            rx: self.session.clone(),
        }
    }

    /// Current session
    pub fn current(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Whether the controller has not been torn down
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Tear down without waiting for the background task
    ///
    /// Calling it again is a no-op.
    pub fn teardown(&mut self) {
        if self.task.take().is_some() {
            debug!("Tearing down session controller");
            self.cancel.cancel();
        }
    }

    /// Tear down and wait until the subscription has been released
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Session controller task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for AuthSessionController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    provider: Arc<dyn IdentityProvider>,
    policy: SessionPolicy,
    session: watch::Sender<Session>,
    cancel: CancellationToken,
) {
    if policy.clear_session_on_launch {
        // The sign-out runs as its own task so teardown never cuts it short.
        let clearing = Arc::clone(&provider);
        let clear = tokio::spawn(async move { clearing.force_sign_out().await });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Torn down during forced sign-out, discarding its result");
                return;
            }
            outcome = clear => match outcome {
                Ok(Ok(())) => info!("Cleared persisted session on launch"),
                Ok(Err(e)) => warn!("Forced sign-out failed, continuing: {}", e),
                Err(e) => warn!("Forced sign-out task failed, continuing: {}", e),
            },
        }
    }

    let mut subscription = provider.subscribe();
    debug!("Subscribed to authentication state");

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = subscription.next() => event,
        };

        match event {
            Some(AuthEvent::SignedIn(identity)) => {
                info!("Session authenticated for {}", identity.uid);
                session.send_replace(Session::Authenticated(identity));
            }
            Some(AuthEvent::SignedOut) => {
                info!("Session anonymous");
                session.send_replace(Session::Anonymous);
            }
            Some(AuthEvent::Failed(reason)) => {
                warn!("Authentication stream failed: {}", reason);
                session.send_replace(Session::Anonymous);
                break;
            }
            None => {
                let initializing = !session.borrow().is_resolved();
                if initializing {
                    session.send_replace(Session::Anonymous);
                }
                warn!("Authentication stream closed");
                break;
            }
        }
    }

    drop(subscription);
    debug!("Unsubscribed from authentication state");
}
