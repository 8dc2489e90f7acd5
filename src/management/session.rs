use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::{management::Clock, types::TokenRecord};

struct CacheEntry {
    token: TokenRecord,
    touched_at: DateTime<Utc>,
}

/// Token storage keyed by browser session id.
///
/// Reads and writes for one session are serialized by a single lock, so a
/// `put` is always observed by the next `get` for the same session. Entries
/// idle for longer than the session lifetime count as absent and are dropped
/// lazily.
pub struct SessionTokenCache {
    clock: Arc<dyn Clock>,
    session_ttl: TimeDelta,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl SessionTokenCache {
    pub fn new(clock: Arc<dyn Clock>, session_ttl: Duration) -> Self {
        Self {
            clock,
            session_ttl: TimeDelta::from_std(session_ttl).unwrap_or(TimeDelta::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the stored record unchanged. No validity checks happen here.
    pub async fn get(&self, session_id: &str) -> Option<TokenRecord> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let idle = entries
            .get(session_id)
            .map(|entry| self.is_idle(entry, now))?;
        if idle {
            entries.remove(session_id);
            return None;
        }

        let entry = entries.get_mut(session_id)?;
        entry.touched_at = now;
        Some(entry.token.clone())
    }

    /// Stores `token` for the session, replacing any previous record.
    pub async fn put(&self, session_id: &str, token: TokenRecord) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        entries.retain(|_, entry| !self.is_idle(entry, now));
        entries.insert(
            session_id.to_string(),
            CacheEntry {
                token,
                touched_at: now,
            },
        );
    }

    /// Removes the session's record. Returns whether one was stored.
    pub async fn clear(&self, session_id: &str) -> bool {
        self.entries.lock().await.remove(session_id).is_some()
    }

    /// How long an idle session is kept.
    pub fn session_ttl(&self) -> TimeDelta {
        self.session_ttl
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_idle(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.touched_at > self.session_ttl
    }
}
