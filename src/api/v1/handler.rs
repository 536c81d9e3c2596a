use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::server::Server;
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use warp::http::HeaderMap;
use warp::{Reply, reject};

pub const CSRF_COOKIE_NAME: &str = "csrf";
const CSRF_LEN: usize = 32;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// What this service keeps in a session's payload: the anti-forgery value the
/// client has to echo back in a header.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionPayload {
    pub csrf: String,
}

fn respond<T: Serialize>(data: T, headers: HeaderMap) -> warp::reply::Response {
    let mut response = warp::reply::json(&ApiResponse::ok(data)).into_response();
    response.headers_mut().extend(headers);
    response
}

/// A live session whose CSRF header matched, with the CSRF value it carries.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub session: UserSession,
    pub csrf: String,
}

/// Resolves the request's session and checks its CSRF header. Anything short of a
/// live session with a matching header is `Unauthenticated`.
pub async fn authenticate(
    server: &Server,
    request: &HeaderMap,
) -> Result<Authenticated, ApiErrorCode> {
    let session = match server.session_service.validate(request).await? {
        SessionStatus::Authenticated(session) => session,
        SessionStatus::Unauthenticated => return Err(ApiErrorCode::Unauthenticated),
    };

    let payload: SessionPayload =
        serde_json::from_str(&session.payload).map_err(ApiErrorCode::internal)?;
    let presented = request
        .get(server.csrf_header.as_str())
        .and_then(|v| v.to_str().ok());
    if presented != Some(payload.csrf.as_str()) {
        debug!(session_id = %session.id, "csrf header missing or wrong");
        return Err(ApiErrorCode::Unauthenticated);
    }

    Ok(Authenticated {
        session,
        csrf: payload.csrf,
    })
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub user_id: String,
    pub csrf: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn issue_session(
    body: IssueRequest,
    server: Arc<Server>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if body.user_id.is_empty() {
        return Err(reject::custom(ApiErrorCode::InvalidRequest));
    }

    let csrf = nanoid!(CSRF_LEN);
    let payload = serde_json::to_string(&SessionPayload { csrf: csrf.clone() })
        .map_err(ApiErrorCode::internal)
        .map_err(reject::custom)?;

    let mut headers = HeaderMap::new();
    let session = server
        .session_service
        .issue(&body.user_id, &payload, &mut headers)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    // readable by scripts so they can echo it in the CSRF header
    server
        .cookies
        .append_cookie(CSRF_COOKIE_NAME, &csrf, session.expires_at, false, &mut headers)
        .map_err(ApiErrorCode::internal)
        .map_err(reject::custom)?;

    let response = IssueResponse {
        user_id: session.user_id,
        csrf,
        expires_at: session.expires_at,
    };
    Ok(respond(response, headers))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn current_session(
    auth: Authenticated,
    request: HeaderMap,
    server: Arc<Server>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut headers = HeaderMap::new();
    let session = server
        .session_service
        .extend(auth.session, &request, &mut headers)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    server
        .cookies
        .append_cookie(CSRF_COOKIE_NAME, &auth.csrf, session.expires_at, false, &mut headers)
        .map_err(ApiErrorCode::internal)
        .map_err(reject::custom)?;

    let response = SessionResponse {
        user_id: session.user_id,
        expires_at: session.expires_at,
    };
    Ok(respond(response, headers))
}

pub async fn end_session(
    auth: Authenticated,
    _request: HeaderMap,
    server: Arc<Server>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut headers = HeaderMap::new();
    server
        .session_service
        .clear(&auth.session, &mut headers)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    server
        .cookies
        .append_cookie(CSRF_COOKIE_NAME, "", a_long_time_ago(), false, &mut headers)
        .map_err(ApiErrorCode::internal)
        .map_err(reject::custom)?;

    Ok(respond((), headers))
}
