use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width in bytes of the canonical text form of a [`SessionId`]. This is the part
/// of a signed token that precedes the MAC tag.
pub const SESSION_ID_LEN: usize = uuid::fmt::Hyphenated::LENGTH;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid session id: {0}")]
pub struct InvalidSessionId(String);

impl std::str::FromStr for SessionId {
    type Err = InvalidSessionId;

    /// Only the 36-character hyphenated form is accepted, since that is the exact
    /// byte sequence covered by the token signature.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != SESSION_ID_LEN {
            return Err(InvalidSessionId(format!(
                "expected {} bytes, got {}",
                SESSION_ID_LEN,
                s.len()
            )));
        }
        uuid::Uuid::try_parse(s)
            .map(SessionId)
            .map_err(|e| InvalidSessionId(e.to_string()))
    }
}

/// Server-side record of one user session.
///
/// The store's native expiry decides whether a record still exists; `expires_at`
/// mirrors it for callers and for the cookie expiry, and is only moved by
/// `SessionService::extend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSession {
    pub id: SessionId,
    pub user_id: String,
    pub payload: String,
    pub expires_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(
        user_id: impl Into<String>,
        payload: impl Into<String>,
        ttl: std::time::Duration,
    ) -> Self {
        UserSession {
            id: SessionId::generate(),
            user_id: user_id.into(),
            payload: payload.into(),
            expires_at: Utc::now() + ttl,
        }
    }
}

/// Expiry used to revoke: far enough back that neither the store nor any browser
/// can consider it current, whatever the clock skew.
pub fn a_long_time_ago() -> DateTime<Utc> {
    Utc::now() - chrono::Duration::hours(1000)
}
