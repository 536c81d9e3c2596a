mod hmac_session_signer;
mod session_service_impl;

pub use hmac_session_signer::*;
pub use session_service_impl::*;
