use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_cookie::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::{anyhow, bail};
use std::sync::Arc;

pub const DEFAULT_CSRF_HEADER: &str = "X-CSRF-Token";

/// Everything the HTTP layer needs, wired from settings.
pub struct Server {
    pub session_service: Arc<dyn SessionService>,
    pub cookies: Arc<CookieTransport>,
    pub csrf_header: String,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let signer: Arc<dyn SessionSigner> = Arc::new(
            HmacSessionSigner::new(settings.session.secret_key.as_bytes())
                .map_err(|e| anyhow!("session signer: {}", e))?,
        );

        let store: Arc<dyn SessionStore> = match settings.store.backend.as_str() {
            "fake" => {
                warn!("using the in-memory session store; sessions are lost on restart");
                Arc::new(MemorySessionStore::new())
            }
            "real" => {
                let config = settings.store.redis.with_defaults();
                let client = redis::Client::open(config.url.as_str())?;
                let manager = client.get_connection_manager().await?;
                info!(prefix = %config.key_prefix, "connected to redis session store");
                Arc::new(RedisSessionStore::new(manager, &config))
            }
            other => bail!("unknown store backend {:?}, expected \"fake\" or \"real\"", other),
        };

        let cookies = Arc::new(CookieTransport::new(settings.cookie.with_defaults()));
        let csrf_header = match settings.http.csrf_header.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => DEFAULT_CSRF_HEADER.to_string(),
        };

        let session_service = Arc::new(RealSessionService::new(
            signer,
            store,
            cookies.clone(),
            settings.session.options().with_defaults(),
        ));

        Ok(Self::from_parts(session_service, cookies, csrf_header))
    }

    pub fn from_parts(
        session_service: Arc<dyn SessionService>,
        cookies: Arc<CookieTransport>,
        csrf_header: String,
    ) -> Self {
        Server {
            session_service,
            cookies,
            csrf_header,
        }
    }
}
