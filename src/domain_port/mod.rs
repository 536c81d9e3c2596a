mod session_store;
mod session_transport;

pub use session_store::*;
pub use session_transport::*;
