use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), code.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::InvalidRequest, e.to_string())
    } else if let Some(code) = body_rejection(&err) {
        (code.clone(), code.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::MethodNotAllowed, ApiErrorCode::MethodNotAllowed.to_string())
    } else {
        warn!("unhandled rejection: {:?}", err);
        (ApiErrorCode::InternalError, ApiErrorCode::InternalError.to_string())
    };

    let status = code.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, status))
}

// Routes are or-ed, so a body rejection from the matching branch arrives merged
// with MethodNotAllowed from the others and has to be looked for first.
fn body_rejection(err: &Rejection) -> Option<ApiErrorCode> {
    if err.find::<reject::PayloadTooLarge>().is_some() {
        Some(ApiErrorCode::PayloadTooLarge)
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        Some(ApiErrorCode::UnsupportedMediaType)
    } else if err.find::<reject::LengthRequired>().is_some() {
        Some(ApiErrorCode::LengthRequired)
    } else {
        None
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
pub enum ApiErrorCode {
    // One code for missing, forged, expired and CSRF-less sessions alike.
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Malformed request")]
    InvalidRequest,
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Unsupported content type")]
    UnsupportedMediaType,
    #[error("Content-Length required")]
    LengthRequired,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiErrorCode::LengthRequired => StatusCode::LENGTH_REQUIRED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

// Every session fault is an infrastructure problem: 5xx, never 401.
impl From<SessionError> for ApiErrorCode {
    fn from(error: SessionError) -> Self {
        ApiErrorCode::internal(error)
    }
}
