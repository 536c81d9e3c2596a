use crate::domain_model::{SessionId, UserSession};

/// Result of looking a session up. `Absent` covers expired, revoked and never-issued
/// ids alike and is not a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLookup {
    Found(UserSession),
    Absent,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt session record: {0}")]
    Corrupt(String),
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Upsert the record and set the backing expiry to `session.expires_at` in one
    /// atomic step.
    async fn save(&self, session: &UserSession) -> Result<(), SessionStoreError>;
    /// Fetch a live record. The backing store's own expiry decides liveness.
    async fn fetch_valid(&self, id: &SessionId) -> Result<StoreLookup, SessionStoreError>;
    /// Expire the record. Deleting an unknown id succeeds.
    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError>;
}
