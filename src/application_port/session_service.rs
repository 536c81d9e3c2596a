use crate::domain_model::UserSession;
use crate::domain_port::{SessionStoreError, TransportError};
use std::time::Duration;
use warp::http::HeaderMap;

pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(3 * 24 * 60 * 60); // 72h

/// Session lifetime as read from configuration. Unset (or zero) falls back to
/// [`DEFAULT_EXPIRATION`].
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub expiration_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub expiration: Duration,
}

impl SessionOptions {
    pub fn with_defaults(&self) -> SessionConfig {
        let expiration = match self.expiration_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_EXPIRATION,
        };
        SessionConfig { expiration }
    }
}

/// What a request turned out to carry. Faults are reported separately through
/// [`SessionError`] so that an outage can never look like a logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Authenticated(UserSession),
    Unauthenticated,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("corrupt session record: {0}")]
    CorruptRecord(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<SessionStoreError> for SessionError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::Unavailable(e) => SessionError::StoreUnavailable(e),
            SessionStoreError::Corrupt(e) => SessionError::CorruptRecord(e),
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        SessionError::Transport(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Create and persist a new session for `user_id`, then set its cookie on
    /// `response`. Nothing is written if persisting fails.
    async fn issue(
        &self,
        user_id: &str,
        payload: &str,
        response: &mut HeaderMap,
    ) -> Result<UserSession, SessionError>;
    async fn validate(&self, request: &HeaderMap) -> Result<SessionStatus, SessionError>;
    /// Push the expiry out by the configured lifetime, in the store and on the cookie.
    async fn extend(
        &self,
        session: UserSession,
        request: &HeaderMap,
        response: &mut HeaderMap,
    ) -> Result<UserSession, SessionError>;
    /// Revoke in the store first; the cookie is only cleared once that succeeded.
    async fn clear(
        &self,
        session: &UserSession,
        response: &mut HeaderMap,
    ) -> Result<(), SessionError>;
}
