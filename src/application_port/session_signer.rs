use crate::domain_model::{SessionId, SignedToken};

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("signer misconfigured: {0}")]
    Configuration(String),
    #[error("token is not valid base64url")]
    Decode,
    #[error("token failed verification")]
    InvalidToken,
}

/// Binds a session id to a tag only the holder of the signing key can produce.
pub trait SessionSigner: Send + Sync {
    fn sign(&self, id: &SessionId) -> SignedToken;
    /// Returns the id carried by `token` if, and only if, its tag is intact.
    fn verify(&self, token: &SignedToken) -> Result<SessionId, SignerError>;
}
