use crate::application_port::{SessionSigner, SignerError};
use crate::domain_model::{SESSION_ID_LEN, SessionId, SignedToken};
use base64::Engine;
use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha512;
use std::fmt;

type HmacSha512 = Hmac<Sha512>;

/// URL-safe alphabet. Output is padded, input is accepted with or without padding.
const TOKEN_ENCODING: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Signs session ids as `base64url(id || HMAC-SHA512(key, id))`.
pub struct HmacSessionSigner {
    // keyed once, cloned per operation
    mac: HmacSha512,
}

impl HmacSessionSigner {
    /// Fails only for an empty key. No minimum length is enforced.
    pub fn new(key: &[u8]) -> Result<Self, SignerError> {
        if key.is_empty() {
            return Err(SignerError::Configuration("no session key".to_string()));
        }
        let mac = HmacSha512::new_from_slice(key)
            .map_err(|e| SignerError::Configuration(e.to_string()))?;
        Ok(Self { mac })
    }
}

impl fmt::Debug for HmacSessionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HmacSessionSigner { .. }")
    }
}

impl SessionSigner for HmacSessionSigner {
    fn sign(&self, id: &SessionId) -> SignedToken {
        let id_text = id.to_string();
        let mut mac = self.mac.clone();
        mac.update(id_text.as_bytes());
        let tag = mac.finalize().into_bytes();

        let mut signed = Vec::with_capacity(id_text.len() + tag.len());
        signed.extend_from_slice(id_text.as_bytes());
        signed.extend_from_slice(&tag);
        SignedToken(TOKEN_ENCODING.encode(signed))
    }

    fn verify(&self, token: &SignedToken) -> Result<SessionId, SignerError> {
        let decoded = TOKEN_ENCODING
            .decode(token.as_str())
            .map_err(|_| SignerError::Decode)?;

        // A token that is all id and no tag must never pass.
        if decoded.len() <= SESSION_ID_LEN {
            return Err(SignerError::InvalidToken);
        }
        let (id_bytes, tag) = decoded.split_at(SESSION_ID_LEN);

        let mut mac = self.mac.clone();
        mac.update(id_bytes);
        mac.verify_slice(tag)
            .map_err(|_| SignerError::InvalidToken)?;

        std::str::from_utf8(id_bytes)
            .map_err(|_| SignerError::InvalidToken)?
            .parse::<SessionId>()
            .map_err(|_| SignerError::InvalidToken)
    }
}
