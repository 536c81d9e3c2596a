use crate::domain_model::*;
use crate::domain_port::*;
use chrono::DateTime;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

const FIELD_USER_ID: &str = "UserID";
const FIELD_PAYLOAD: &str = "JSON";
const FIELD_EXPIRES_AT: &str = "ExpiresAtSeconds";

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_KEY_PREFIX: &str = "session";
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// An explicitly empty `key_prefix` stores sessions under their bare id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisStoreOptions {
    pub url: Option<String>,
    pub key_prefix: Option<String>,
    pub command_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisStoreConfig {
    pub url: String,
    pub key_prefix: String,
    pub command_timeout: Duration,
}

impl RedisStoreOptions {
    pub fn with_defaults(&self) -> RedisStoreConfig {
        let non_empty = |v: &Option<String>, default: &str| match v.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => default.to_string(),
        };
        RedisStoreConfig {
            url: non_empty(&self.url, DEFAULT_REDIS_URL),
            key_prefix: self
                .key_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            command_timeout: match self.command_timeout_ms {
                Some(ms) if ms > 0 => Duration::from_millis(ms),
                _ => DEFAULT_COMMAND_TIMEOUT,
            },
        }
    }
}

/// Sessions as Redis hashes, one key per session, with `EXPIREAT` on the same key
/// deciding when the session stops existing.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    command_timeout: Duration,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, config: &RedisStoreConfig) -> Self {
        RedisSessionStore {
            conn,
            prefix: config.key_prefix.clone(),
            command_timeout: config.command_timeout,
        }
    }

    fn key(&self, id: &SessionId) -> String {
        session_key(&self.prefix, id)
    }
}

fn session_key(prefix: &str, id: &SessionId) -> String {
    if prefix.is_empty() {
        id.to_string()
    } else {
        format!("{}:{}", prefix, id)
    }
}

/// Runs one store round trip under `limit`. A timeout is reported as the store being
/// unavailable, never as a missing session.
async fn with_deadline<T>(
    limit: Duration,
    op: impl Future<Output = RedisResult<T>>,
) -> Result<T, SessionStoreError> {
    match tokio::time::timeout(limit, op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SessionStoreError::Unavailable(e.to_string())),
        Err(_) => Err(SessionStoreError::Unavailable(format!(
            "no reply within {:?}",
            limit
        ))),
    }
}

fn decode_record(
    id: SessionId,
    fields: Vec<Option<Vec<u8>>>,
) -> Result<UserSession, SessionStoreError> {
    let corrupt = |what: &str| SessionStoreError::Corrupt(format!("{}: {}", id, what));

    let [user_id, payload, expires_at]: [Option<Vec<u8>>; 3] = fields
        .try_into()
        .map_err(|f: Vec<_>| corrupt(&format!("expected 3 fields, got {}", f.len())))?;

    let text = |field: Option<Vec<u8>>, name: &str| -> Result<String, SessionStoreError> {
        let bytes = field.ok_or_else(|| corrupt(&format!("missing {}", name)))?;
        String::from_utf8(bytes).map_err(|_| corrupt(&format!("{} is not utf-8", name)))
    };

    let user_id = text(user_id, FIELD_USER_ID)?;
    let payload = text(payload, FIELD_PAYLOAD)?;
    let expires_at_secs: i64 = text(expires_at, FIELD_EXPIRES_AT)?
        .parse()
        .map_err(|_| corrupt(&format!("{} is not an integer", FIELD_EXPIRES_AT)))?;
    let expires_at = DateTime::from_timestamp(expires_at_secs, 0)
        .ok_or_else(|| corrupt(&format!("{} out of range", FIELD_EXPIRES_AT)))?;

    Ok(UserSession {
        id,
        user_id,
        payload,
        expires_at,
    })
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, session: &UserSession) -> Result<(), SessionStoreError> {
        let key = self.key(&session.id);
        let expires_at = session.expires_at.timestamp();
        let expires_at_text = expires_at.to_string();
        let mut conn = self.conn.clone();

        // MULTI/EXEC: readers see either nothing new or the fields with their expiry.
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(
                &key,
                &[
                    (FIELD_USER_ID, session.user_id.as_str()),
                    (FIELD_PAYLOAD, session.payload.as_str()),
                    (FIELD_EXPIRES_AT, expires_at_text.as_str()),
                ],
            )
            .ignore()
            .expire_at(&key, expires_at)
            .ignore();

        let _: () = with_deadline(self.command_timeout, pipe.query_async(&mut conn)).await?;
        Ok(())
    }

    async fn fetch_valid(&self, id: &SessionId) -> Result<StoreLookup, SessionStoreError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .exists(&key)
            .cmd("HMGET")
            .arg(&key)
            .arg(FIELD_USER_ID)
            .arg(FIELD_PAYLOAD)
            .arg(FIELD_EXPIRES_AT);

        let (exists, fields): (bool, Vec<Option<Vec<u8>>>) =
            with_deadline(self.command_timeout, pipe.query_async(&mut conn)).await?;
        if !exists {
            return Ok(StoreLookup::Absent);
        }

        decode_record(*id, fields).map(StoreLookup::Found)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let _: bool = with_deadline(
            self.command_timeout,
            conn.expire_at(&key, a_long_time_ago().timestamp()),
        )
        .await?;
        Ok(())
    }
}
