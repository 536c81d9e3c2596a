use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// In-process session store. Expired entries are dropped when read, and all of
/// them are swept whenever a session is saved.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<DashMap<SessionId, UserSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune_expired(&self, now: DateTime<Utc>) {
        self.entries.retain(|_, session| session.expires_at > now);
    }

    #[cfg(test)]
    fn live_count(&self) -> usize {
        let now = Utc::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &UserSession) -> Result<(), SessionStoreError> {
        self.prune_expired(Utc::now());
        self.entries.insert(session.id, session.clone());
        Ok(())
    }

    async fn fetch_valid(&self, id: &SessionId) -> Result<StoreLookup, SessionStoreError> {
        let now = Utc::now();
        if let Some(session) = self.entries.get(id) {
            if session.expires_at > now {
                return Ok(StoreLookup::Found(session.clone()));
            }
        }
        self.entries.remove_if(id, |_, session| session.expires_at <= now);
        Ok(StoreLookup::Absent)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        self.entries.remove(id);
        Ok(())
    }
}
