use crate::application_port::SessionOptions;
use crate::infra_cookie::CookieOptions;
use crate::infra_redis::RedisStoreOptions;
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub session: Session,
    #[serde(default)]
    pub cookie: CookieOptions,
    pub store: Store,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub csrf_header: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Session {
    #[serde(default)]
    pub secret_key: String,
    pub expiration_secs: Option<u64>,
}

impl Session {
    pub fn options(&self) -> SessionOptions {
        SessionOptions {
            expiration_secs: self.expiration_secs,
        }
    }
}

// The signing key must never reach the logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("secret_key", &format_args!("<{} bytes>", self.secret_key.len()))
            .field("expiration_secs", &self.expiration_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "fake" or "real"
    #[serde(default)]
    pub redis: RedisStoreOptions,
}

pub const ENV_PREFIX: &str = "SESSIONIST";

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the settings file, then lets `SESSIONIST__SECTION__KEY` environment
/// variables override individual values (e.g. `SESSIONIST__SESSION__SECRET_KEY`).
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
