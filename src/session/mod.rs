//! Authentication session module
//!
//! - `identity` - Identity provider port and the in-memory provider
//! - `controller` - Session state machine and the session signal

pub mod controller;
pub mod identity;

pub use controller::{AuthSessionController, Session, SessionPolicy, SessionSignal, SessionStatus};
pub use identity::{
    AuthError, AuthEvent, AuthSubscription, Identity, IdentityProvider, InMemoryIdentityProvider,
};
