use super::handler;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::HeaderMap;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let issue = warp::post()
        .and(warp::path("session"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(4 * 1024))
        .and(warp::body::json())
        .and(with(server.clone()))
        .and_then(handler::issue_session);

    let current = warp::get()
        .and(warp::path("session"))
        .and(warp::path::end())
        .and(with_session(server.clone()))
        .and(with(server.clone()))
        .and_then(handler::current_session);

    let end = warp::delete()
        .and(warp::path("session"))
        .and(warp::path::end())
        .and(with_session(server.clone()))
        .and(with(server.clone()))
        .and_then(handler::end_session);

    issue.or(current).or(end)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Passes the authenticated session along with the request headers, which `extend`
/// needs to re-issue the cookie.
fn with_session(
    server: Arc<Server>,
) -> impl Filter<Extract = (handler::Authenticated, HeaderMap), Error = warp::Rejection> + Clone {
    warp::header::headers_cloned()
        .and_then(move |headers: HeaderMap| {
            let server = server.clone();
            async move {
                let auth = handler::authenticate(&server, &headers)
                    .await
                    .map_err(reject::custom)?;
                Ok::<_, warp::Rejection>((auth, headers))
            }
        })
        .untuple_one()
}
