mod cookie_transport;

pub use cookie_transport::*;
