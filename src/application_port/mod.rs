mod session_service;
mod session_signer;

pub use session_service::*;
pub use session_signer::*;
