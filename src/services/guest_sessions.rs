//! Guest session bookkeeping for unauthenticated valuations.
//!
//! This module provides an in-memory store mapping opaque session tokens to
//! the guest-owned valuations they created, with a last-seen timestamp per
//! session. The store is owned by the application state and passed by
//! reference through the request context; expiry runs from a background
//! sweep task owned by the server binary, never from inside the store.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::ValuationId;
use crate::db::repository::FullRepository;

/// A guest session and the valuations it owns.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GuestSession {
    pub token: String,
    pub valuation_ids: Vec<ValuationId>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// In-memory guest session store with TTL-based expiry.
///
/// Sessions are scratch data: they survive only the process lifetime and
/// are dropped, together with the ids of the valuations they own, once idle
/// past the configured TTL.
pub struct GuestSessionStore {
    sessions: RwLock<HashMap<String, GuestSession>>,
    ttl: Duration,
}

impl GuestSessionStore {
    /// Create a store whose sessions expire after `ttl` of inactivity.
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::hours(1)),
        }
    }

    /// Create a new session and return its token.
    pub fn create_session(&self) -> String {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = GuestSession {
            token: token.clone(),
            valuation_ids: vec![],
            created_at: now,
            last_seen: now,
        };
        self.sessions.write().insert(token.clone(), session);
        token
    }

    /// Refresh a session's last-seen time. Returns false when the token is
    /// unknown (expired or never issued).
    pub fn touch(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(token) {
            Some(session) => {
                session.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Record that a session owns a valuation, creating the session if the
    /// token is unknown.
    pub fn register_valuation(&self, token: &str, valuation_id: ValuationId) {
        let mut sessions = self.sessions.write();
        let now = Utc::now();
        let session = sessions
            .entry(token.to_string())
            .or_insert_with(|| GuestSession {
                token: token.to_string(),
                valuation_ids: vec![],
                created_at: now,
                last_seen: now,
            });
        session.last_seen = now;
        if !session.valuation_ids.contains(&valuation_id) {
            session.valuation_ids.push(valuation_id);
        }
    }

    /// Check whether a session owns a valuation, refreshing last-seen.
    pub fn owns(&self, token: &str, valuation_id: ValuationId) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(token) {
            Some(session) => {
                session.last_seen = Utc::now();
                session.valuation_ids.contains(&valuation_id)
            }
            None => false,
        }
    }

    /// Forget a valuation (after it was deleted through the API).
    pub fn remove_valuation(&self, token: &str, valuation_id: ValuationId) {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get_mut(token) {
            session.valuation_ids.retain(|id| *id != valuation_id);
        }
    }

    /// Drop sessions idle past the TTL as of `now`, returning the ids of the
    /// valuations they owned so the caller can delete them from storage.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Vec<ValuationId> {
        let mut sessions = self.sessions.write();
        let mut orphaned = Vec::new();
        sessions.retain(|_, session| {
            if now - session.last_seen > self.ttl {
                orphaned.extend(session.valuation_ids.iter().copied());
                false
            } else {
                true
            }
        });
        orphaned
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

/// Spawn the periodic expiry sweep.
///
/// Every `interval` the sweep purges idle sessions and deletes the guest
/// valuations they owned. The task runs until the process exits.
pub fn spawn_expiry_sweep(
    store: Arc<GuestSessionStore>,
    repository: Arc<dyn FullRepository>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately; skip it so an empty store is not
        // swept at startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let orphaned = store.purge_expired(Utc::now());
            if orphaned.is_empty() {
                continue;
            }
            log::info!(
                "Guest session sweep: removing {} orphaned valuations",
                orphaned.len()
            );
            for valuation_id in orphaned {
                if let Err(e) = repository.delete_valuation(valuation_id).await {
                    log::warn!(
                        "Failed to delete expired guest valuation {}: {}",
                        valuation_id,
                        e
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_ttl_secs(secs: u64) -> GuestSessionStore {
        GuestSessionStore::new(std::time::Duration::from_secs(secs))
    }

    #[test]
    fn test_create_and_touch() {
        let store = store_with_ttl_secs(60);
        let token = store.create_session();
        assert!(store.touch(&token));
        assert!(!store.touch("unknown-token"));
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn test_register_and_ownership() {
        let store = store_with_ttl_secs(60);
        let token = store.create_session();
        let id = ValuationId::new(5);
        store.register_valuation(&token, id);

        assert!(store.owns(&token, id));
        assert!(!store.owns(&token, ValuationId::new(6)));
        assert!(!store.owns("other-token", id));

        store.remove_valuation(&token, id);
        assert!(!store.owns(&token, id));
    }

    #[test]
    fn test_register_creates_session_for_unknown_token() {
        let store = store_with_ttl_secs(60);
        store.register_valuation("client-minted", ValuationId::new(1));
        assert_eq!(store.session_count(), 1);
        assert!(store.owns("client-minted", ValuationId::new(1)));
    }

    #[test]
    fn test_purge_expired_returns_orphans() {
        let store = store_with_ttl_secs(60);
        let token = store.create_session();
        store.register_valuation(&token, ValuationId::new(9));

        // Nothing expires inside the TTL window
        assert!(store.purge_expired(Utc::now()).is_empty());
        assert_eq!(store.session_count(), 1);

        // Past the TTL the session and its valuations are dropped
        let later = Utc::now() + Duration::seconds(120);
        let orphaned = store.purge_expired(later);
        assert_eq!(orphaned, vec![ValuationId::new(9)]);
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_purge_collects_all_idle_sessions() {
        let store = store_with_ttl_secs(60);
        let a = store.create_session();
        store.register_valuation(&a, ValuationId::new(1));
        let b = store.create_session();
        store.register_valuation(&b, ValuationId::new(2));

        let later = Utc::now() + Duration::seconds(90);
        let mut orphaned = store.purge_expired(later);
        orphaned.sort();
        assert_eq!(orphaned, vec![ValuationId::new(1), ValuationId::new(2)]);
        assert_eq!(store.session_count(), 0);
    }
}
