//! In-memory TTL cache for status responses

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, RwLock};
use tracing::{debug, warn};

use super::models::ParticipantStatusResponse;

struct CacheEntry {
    response: ParticipantStatusResponse,
    expires_at: Instant,
}

/// TTL cache for participant status responses.
///
/// Expiry is enforced at read time: an entry past its TTL is never returned,
/// whether or not the background reaper has removed it yet. The reaper only
/// reclaims memory; it runs on a fixed interval and holds the write lock for
/// one sweep at a time.
pub struct StatusCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
    stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl StatusCache {
    /// Create a cache and spawn its background reaper.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(ttl: Duration, reap_interval: Duration) -> Self {
        let entries: Arc<RwLock<HashMap<String, CacheEntry>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let reap_entries = Arc::clone(&entries);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(reap_interval);
            // The first tick completes immediately; consume it so the first
            // sweep happens one full interval after construction.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Instant::now();
                        let mut map = reap_entries.write().await;
                        let before = map.len();
                        map.retain(|_, entry| entry.expires_at > now);
                        let reaped = before - map.len();
                        if reaped > 0 {
                            debug!(reaped, remaining = map.len(), "Reaped expired status cache entries");
                        }
                    }
                    _ = &mut stop_rx => {
                        debug!("Status cache reaper stopped");
                        return;
                    }
                }
            }
        });

        Self {
            entries,
            ttl,
            stop: Mutex::new(Some(stop_tx)),
        }
    }

    /// Get a cached response if one exists and has not expired
    pub async fn get(&self, key: &str) -> Option<ParticipantStatusResponse> {
        let map = self.entries.read().await;
        match map.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.response.clone()),
            _ => None,
        }
    }

    /// Store a response, replacing any previous entry wholesale
    pub async fn set(&self, key: impl Into<String>, response: ParticipantStatusResponse) {
        let entry = CacheEntry {
            response,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Remove one participant from the cache
    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Remove all entries
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Stop the background reaper.
    ///
    /// Intended to be called exactly once during shutdown; further calls
    /// log a warning and do nothing.
    pub fn stop(&self) {
        let Ok(mut guard) = self.stop.lock() else {
            warn!("Status cache stop guard poisoned");
            return;
        };
        match guard.take() {
            Some(tx) => {
                let _ = tx.send(());
            }
            None => warn!("Status cache already stopped"),
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
