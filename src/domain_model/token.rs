use std::fmt;

/// The signed, encoded session id exactly as it travels in the cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken(pub String);

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are bearer credentials; keep them out of logs.
impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedToken(<{} chars>)", self.0.len())
    }
}

impl From<String> for SignedToken {
    fn from(value: String) -> Self {
        SignedToken(value)
    }
}
