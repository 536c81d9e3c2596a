use crate::domain_model::SignedToken;
use chrono::{DateTime, Utc};
use warp::http::HeaderMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLookup {
    Present(SignedToken),
    Absent,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot encode carrier header: {0}")]
    InvalidHeader(String),
}

/// Moves tokens between HTTP headers and the session layer. Implementations own the
/// carrier's shape but never look inside a token.
pub trait SessionTransport: Send + Sync {
    fn write_token(
        &self,
        token: &SignedToken,
        expires_at: DateTime<Utc>,
        response: &mut HeaderMap,
    ) -> Result<(), TransportError>;
    fn clear_token(&self, response: &mut HeaderMap) -> Result<(), TransportError>;
    fn read_token(&self, request: &HeaderMap) -> TokenLookup;
}
