mod error;
mod handler;
mod router;

pub use error::{ApiError, ApiErrorCode, recover_error};
pub use handler::{ApiResponse, Authenticated, CSRF_COOKIE_NAME, SessionPayload};
pub use router::routes;
