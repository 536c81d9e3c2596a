use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use cookie::Cookie;
use cookie::time::OffsetDateTime;
use serde::Deserialize;
use warp::http::header::{COOKIE, SET_COOKIE};
use warp::http::{HeaderMap, HeaderValue};

pub const DEFAULT_COOKIE_NAME: &str = "session";
pub const DEFAULT_COOKIE_PATH: &str = "/";

/// Cookie shape as read from configuration; anything left out gets a default.
/// Both flags default to on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CookieOptions {
    pub name: Option<String>,
    pub path: Option<String>,
    pub http_only: Option<bool>,
    pub secure: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
}

impl CookieOptions {
    pub fn with_defaults(&self) -> CookieConfig {
        let non_empty = |v: &Option<String>, default: &str| match v.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => default.to_string(),
        };
        CookieConfig {
            name: non_empty(&self.name, DEFAULT_COOKIE_NAME),
            path: non_empty(&self.path, DEFAULT_COOKIE_PATH),
            http_only: self.http_only.unwrap_or(true),
            secure: self.secure.unwrap_or(true),
        }
    }
}

/// Carries the session token in a single cookie.
pub struct CookieTransport {
    config: CookieConfig,
}

impl CookieTransport {
    pub fn new(config: CookieConfig) -> Self {
        CookieTransport { config }
    }

    pub fn config(&self) -> &CookieConfig {
        &self.config
    }

    /// Appends a `Set-Cookie` for `name=value` with this transport's path and
    /// flags. Also used for companion cookies (the CSRF cookie) that must share the
    /// session cookie's lifetime.
    pub fn append_cookie(
        &self,
        name: &str,
        value: &str,
        expires_at: DateTime<Utc>,
        http_only: bool,
        response: &mut HeaderMap,
    ) -> Result<(), TransportError> {
        let cookie = Cookie::build((name.to_string(), value.to_string()))
            .path(self.config.path.clone())
            .http_only(http_only)
            .secure(self.config.secure)
            .expires(OffsetDateTime::from_unix_timestamp(expires_at.timestamp()).ok())
            .build();
        let header = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| TransportError::InvalidHeader(e.to_string()))?;
        response.append(SET_COOKIE, header);
        Ok(())
    }

    /// First value of cookie `name` on the request, if any.
    fn find_cookie(&self, name: &str, request: &HeaderMap) -> Option<String> {
        request
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }
}

impl SessionTransport for CookieTransport {
    fn write_token(
        &self,
        token: &SignedToken,
        expires_at: DateTime<Utc>,
        response: &mut HeaderMap,
    ) -> Result<(), TransportError> {
        self.append_cookie(
            &self.config.name,
            token.as_str(),
            expires_at,
            self.config.http_only,
            response,
        )
    }

    fn clear_token(&self, response: &mut HeaderMap) -> Result<(), TransportError> {
        self.append_cookie(
            &self.config.name,
            "",
            a_long_time_ago(),
            self.config.http_only,
            response,
        )
    }

    fn read_token(&self, request: &HeaderMap) -> TokenLookup {
        match self.find_cookie(&self.config.name, request) {
            Some(value) => TokenLookup::Present(SignedToken(value)),
            None => TokenLookup::Absent,
        }
    }
}
