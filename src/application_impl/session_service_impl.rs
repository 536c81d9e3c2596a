use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error};
use warp::http::HeaderMap;

/// Issues, validates, extends and clears sessions by composing a signer, a store
/// and a transport. Holds no per-session state of its own.
pub struct RealSessionService {
    signer: Arc<dyn SessionSigner>,
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn SessionTransport>,
    config: SessionConfig,
}

impl RealSessionService {
    pub fn new(
        signer: Arc<dyn SessionSigner>,
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn SessionTransport>,
        config: SessionConfig,
    ) -> Self {
        Self {
            signer,
            store,
            transport,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn fault(session_id: &SessionId, op: &str, err: SessionError) -> SessionError {
        error!(%session_id, op, error = %err, "session fault");
        err
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn issue(
        &self,
        user_id: &str,
        payload: &str,
        response: &mut HeaderMap,
    ) -> Result<UserSession, SessionError> {
        let session = UserSession::new(user_id, payload, self.config.expiration);

        self.store
            .save(&session)
            .await
            .map_err(|e| Self::fault(&session.id, "issue", e.into()))?;

        let token = self.signer.sign(&session.id);
        self.transport
            .write_token(&token, session.expires_at, response)
            .map_err(|e| Self::fault(&session.id, "issue", e.into()))?;

        debug!(
            session_id = %session.id,
            user_id,
            expires_at = %session.expires_at,
            "session issued"
        );
        Ok(session)
    }

    async fn validate(&self, request: &HeaderMap) -> Result<SessionStatus, SessionError> {
        let token = match self.transport.read_token(request) {
            TokenLookup::Present(token) => token,
            TokenLookup::Absent => {
                debug!("no session token on request");
                return Ok(SessionStatus::Unauthenticated);
            }
        };

        // Malformed and forged tokens get the same answer as a missing one.
        let id = match self.signer.verify(&token) {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, "session token rejected");
                return Ok(SessionStatus::Unauthenticated);
            }
        };

        match self.store.fetch_valid(&id).await {
            Ok(StoreLookup::Found(session)) => Ok(SessionStatus::Authenticated(session)),
            Ok(StoreLookup::Absent) => {
                debug!(session_id = %id, "session expired or revoked");
                Ok(SessionStatus::Unauthenticated)
            }
            Err(e) => Err(Self::fault(&id, "validate", e.into())),
        }
    }

    async fn extend(
        &self,
        session: UserSession,
        request: &HeaderMap,
        response: &mut HeaderMap,
    ) -> Result<UserSession, SessionError> {
        let extended = UserSession {
            expires_at: Utc::now() + self.config.expiration,
            ..session
        };

        self.store
            .save(&extended)
            .await
            .map_err(|e| Self::fault(&extended.id, "extend", e.into()))?;

        // The signature only covers the id, so the token the client sent stays valid;
        // signing is deterministic, so re-signing yields the same token if it is gone.
        let token = match self.transport.read_token(request) {
            TokenLookup::Present(token) => token,
            TokenLookup::Absent => self.signer.sign(&extended.id),
        };
        self.transport
            .write_token(&token, extended.expires_at, response)
            .map_err(|e| Self::fault(&extended.id, "extend", e.into()))?;

        debug!(
            session_id = %extended.id,
            expires_at = %extended.expires_at,
            "session extended"
        );
        Ok(extended)
    }

    async fn clear(
        &self,
        session: &UserSession,
        response: &mut HeaderMap,
    ) -> Result<(), SessionError> {
        // While the store still holds the session the client must keep its cookie.
        self.store
            .delete(&session.id)
            .await
            .map_err(|e| Self::fault(&session.id, "clear", e.into()))?;

        self.transport
            .clear_token(response)
            .map_err(|e| Self::fault(&session.id, "clear", e.into()))?;

        debug!(session_id = %session.id, "session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::HmacSessionSigner;
    use crate::infra_cookie::{CookieOptions, CookieTransport};
    use crate::infra_memory::MemorySessionStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use warp::http::HeaderValue;
    use warp::http::header::{COOKIE, SET_COOKIE};

    const KEY: &[u8] = b"orchestrator-test-key";

    /// Delegates to an in-memory store and counts every call.
    #[derive(Default)]
    struct CountingStore {
        inner: MemorySessionStore,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SessionStore for CountingStore {
        async fn save(&self, session: &UserSession) -> Result<(), SessionStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.save(session).await
        }

        async fn fetch_valid(&self, id: &SessionId) -> Result<StoreLookup, SessionStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_valid(id).await
        }

        async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(id).await
        }
    }

    /// Every operation fails as if the backend were unreachable.
    struct DownStore;

    #[async_trait::async_trait]
    impl SessionStore for DownStore {
        async fn save(&self, _: &UserSession) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::Unavailable("connection refused".into()))
        }

        async fn fetch_valid(&self, _: &SessionId) -> Result<StoreLookup, SessionStoreError> {
            Err(SessionStoreError::Unavailable("connection refused".into()))
        }

        async fn delete(&self, _: &SessionId) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::Unavailable("connection refused".into()))
        }
    }

    struct CorruptStore;

    #[async_trait::async_trait]
    impl SessionStore for CorruptStore {
        async fn save(&self, _: &UserSession) -> Result<(), SessionStoreError> {
            Ok(())
        }

        async fn fetch_valid(&self, id: &SessionId) -> Result<StoreLookup, SessionStoreError> {
            Err(SessionStoreError::Corrupt(format!("{}: missing UserID", id)))
        }

        async fn delete(&self, _: &SessionId) -> Result<(), SessionStoreError> {
            Ok(())
        }
    }

    fn service_with(store: Arc<dyn SessionStore>) -> RealSessionService {
        RealSessionService::new(
            Arc::new(HmacSessionSigner::new(KEY).unwrap()),
            store,
            Arc::new(CookieTransport::new(CookieOptions::default().with_defaults())),
            SessionOptions::default().with_defaults(),
        )
    }

    /// Turns the `Set-Cookie` headers of a response into the `Cookie` header a
    /// browser would send back.
    fn replay(response: &HeaderMap) -> HeaderMap {
        let pairs: Vec<String> = response
            .get_all(SET_COOKIE)
            .iter()
            .map(|h| {
                let cookie = cookie::Cookie::parse(h.to_str().unwrap().to_string()).unwrap();
                format!("{}={}", cookie.name(), cookie.value())
            })
            .collect();
        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_str(&pairs.join("; ")).unwrap());
        request
    }

    fn request_with_token(token: &SignedToken) -> HeaderMap {
        let mut request = HeaderMap::new();
        request.insert(
            COOKIE,
            HeaderValue::from_str(&format!("session={}", token.as_str())).unwrap(),
        );
        request
    }

    #[tokio::test]
    async fn issued_session_validates_on_replay() {
        let service = service_with(Arc::new(MemorySessionStore::new()));
        let mut response = HeaderMap::new();

        let issued = service.issue("u1", "{}", &mut response).await.unwrap();
        assert_eq!(response.get_all(SET_COOKIE).iter().count(), 1);

        let status = service.validate(&replay(&response)).await.unwrap();
        match status {
            SessionStatus::Authenticated(session) => {
                assert_eq!(session.user_id, "u1");
                assert_eq!(session.payload, "{}");
                assert_eq!(session.id, issued.id);
            }
            SessionStatus::Unauthenticated => panic!("replayed cookie should authenticate"),
        }
    }

    #[tokio::test]
    async fn issue_sets_expiry_from_configured_duration() {
        let service = service_with(Arc::new(MemorySessionStore::new()));
        let before = Utc::now();
        let issued = service.issue("u1", "{}", &mut HeaderMap::new()).await.unwrap();
        let expected = before + Duration::from_secs(72 * 3600);
        assert!((issued.expires_at - expected).num_seconds().abs() <= 1);
    }

    #[tokio::test]
    async fn missing_cookie_is_unauthenticated_without_store_access() {
        let store = Arc::new(CountingStore::default());
        let service = service_with(store.clone());

        let status = service.validate(&HeaderMap::new()).await.unwrap();
        assert_eq!(status, SessionStatus::Unauthenticated);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn garbage_cookie_is_unauthenticated() {
        let store = Arc::new(CountingStore::default());
        let service = service_with(store.clone());

        let request = request_with_token(&SignedToken("garbage-not-base64".into()));
        let status = service.validate(&request).await.unwrap();
        assert_eq!(status, SessionStatus::Unauthenticated);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn token_signed_with_another_key_is_unauthenticated() {
        let store = Arc::new(MemorySessionStore::new());
        let service = service_with(store.clone());
        let session = service.issue("u1", "{}", &mut HeaderMap::new()).await.unwrap();

        let forger = HmacSessionSigner::new(b"some-other-key").unwrap();
        let forged = forger.sign(&session.id);
        let status = service.validate(&request_with_token(&forged)).await.unwrap();
        assert_eq!(status, SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn expired_record_is_unauthenticated_not_a_fault() {
        let store = Arc::new(MemorySessionStore::new());
        let service = service_with(store.clone());
        let signer = HmacSessionSigner::new(KEY).unwrap();

        let mut session = UserSession::new("u1", "{}", Duration::from_secs(60));
        session.expires_at = Utc::now() - chrono::Duration::seconds(1);
        store.save(&session).await.unwrap();

        let request = request_with_token(&signer.sign(&session.id));
        let status = service.validate(&request).await.unwrap();
        assert_eq!(status, SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn unknown_session_id_is_unauthenticated() {
        let service = service_with(Arc::new(MemorySessionStore::new()));
        let signer = HmacSessionSigner::new(KEY).unwrap();
        let request = request_with_token(&signer.sign(&SessionId::generate()));
        assert_eq!(
            service.validate(&request).await.unwrap(),
            SessionStatus::Unauthenticated
        );
    }

    #[tokio::test]
    async fn failing_store_is_a_fault_distinct_from_unauthenticated() {
        let service = service_with(Arc::new(DownStore));
        let signer = HmacSessionSigner::new(KEY).unwrap();
        let request = request_with_token(&signer.sign(&SessionId::generate()));

        let err = service.validate(&request).await.unwrap_err();
        assert!(matches!(err, SessionError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn corrupt_record_is_a_fault() {
        let service = service_with(Arc::new(CorruptStore));
        let signer = HmacSessionSigner::new(KEY).unwrap();
        let request = request_with_token(&signer.sign(&SessionId::generate()));

        let err = service.validate(&request).await.unwrap_err();
        assert!(matches!(err, SessionError::CorruptRecord(_)));
    }

    #[tokio::test]
    async fn failed_save_writes_no_cookie() {
        let service = service_with(Arc::new(DownStore));
        let mut response = HeaderMap::new();

        let err = service.issue("u1", "{}", &mut response).await.unwrap_err();
        assert!(matches!(err, SessionError::StoreUnavailable(_)));
        assert!(response.get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn extend_moves_expiry_forward_in_store_and_cookie() {
        let store = Arc::new(MemorySessionStore::new());
        let service = service_with(store.clone());
        let mut response = HeaderMap::new();
        let mut session = service.issue("u1", "{}", &mut response).await.unwrap();
        let request = replay(&response);

        // pretend the session is about to run out
        session.expires_at = Utc::now() + chrono::Duration::minutes(1);
        store.save(&session).await.unwrap();
        let prior = session.expires_at;

        let mut response = HeaderMap::new();
        let extended = service
            .extend(session.clone(), &request, &mut response)
            .await
            .unwrap();

        assert!(extended.expires_at > prior);
        let expected = Utc::now() + service.config().expiration;
        assert!((extended.expires_at - expected).num_seconds().abs() <= 1);

        match store.fetch_valid(&session.id).await.unwrap() {
            StoreLookup::Found(stored) => assert_eq!(stored.expires_at, extended.expires_at),
            StoreLookup::Absent => panic!("extended session should be live"),
        }

        // same token, new expiry
        let cookie = cookie::Cookie::parse(
            response.get(SET_COOKIE).unwrap().to_str().unwrap().to_string(),
        )
        .unwrap();
        let original = request.get(COOKIE).unwrap().to_str().unwrap();
        assert_eq!(original, format!("session={}", cookie.value()));
        assert_eq!(
            cookie.expires_datetime().unwrap().unix_timestamp(),
            extended.expires_at.timestamp()
        );
    }

    #[tokio::test]
    async fn extend_without_cookie_on_request_resigns_same_token() {
        let service = service_with(Arc::new(MemorySessionStore::new()));
        let mut issued_response = HeaderMap::new();
        let session = service.issue("u1", "{}", &mut issued_response).await.unwrap();

        let mut response = HeaderMap::new();
        service
            .extend(session, &HeaderMap::new(), &mut response)
            .await
            .unwrap();

        let value = |headers: &HeaderMap| {
            let header = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
            cookie::Cookie::parse(header.to_string())
                .unwrap()
                .value()
                .to_string()
        };
        assert_eq!(value(&issued_response), value(&response));
    }

    #[tokio::test]
    async fn extend_fault_leaves_response_untouched() {
        let service = service_with(Arc::new(DownStore));
        let session = UserSession::new("u1", "{}", Duration::from_secs(60));
        let mut response = HeaderMap::new();

        let err = service
            .extend(session, &HeaderMap::new(), &mut response)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::StoreUnavailable(_)));
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn cleared_session_no_longer_validates_and_clear_is_repeatable() {
        let service = service_with(Arc::new(MemorySessionStore::new()));
        let mut response = HeaderMap::new();
        let session = service.issue("u1", "{}", &mut response).await.unwrap();
        let request = replay(&response);

        let mut cleared = HeaderMap::new();
        service.clear(&session, &mut cleared).await.unwrap();
        service.clear(&session, &mut HeaderMap::new()).await.unwrap();

        let cookie = cookie::Cookie::parse(
            cleared.get(SET_COOKIE).unwrap().to_str().unwrap().to_string(),
        )
        .unwrap();
        assert_eq!(cookie.value(), "");

        // the old cookie, replayed after logout, is worthless
        assert_eq!(
            service.validate(&request).await.unwrap(),
            SessionStatus::Unauthenticated
        );
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_cookie() {
        let service = service_with(Arc::new(DownStore));
        let session = UserSession::new("u1", "{}", Duration::from_secs(60));
        let mut response = HeaderMap::new();

        let err = service.clear(&session, &mut response).await.unwrap_err();
        assert!(matches!(err, SessionError::StoreUnavailable(_)));
        assert!(response.get(SET_COOKIE).is_none());
    }
}
