use std::{
    collections::HashMap,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    serde::Serialize,
    tokio::sync::RwLock,
    tracing::{debug, trace},
};

use crate::id::SessionId;

/// What the gateway knows about one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    pub id: SessionId,
    pub created_at: u64,
    pub updated_at: u64,
    pub request_count: u32,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// In-memory index of live sessions, shared by all request handlers.
#[derive(Default)]
pub struct SessionRegistry {
    entries: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new session and record it.
    pub async fn allocate(&self) -> SessionId {
        let id = SessionId::generate();
        let now = now_ms();
        self.entries.write().await.insert(id.clone(), SessionEntry {
            id: id.clone(),
            created_at: now,
            updated_at: now,
            request_count: 0,
        });
        debug!(session = %id, "session allocated");
        id
    }

    /// Use the client's session when it sent a valid one, otherwise mint one.
    /// Unknown but well-formed ids are adopted: the hub, not the gateway,
    /// decides whether a session still means anything.
    pub async fn resolve_or_allocate(&self, supplied: Option<&str>) -> SessionId {
        match supplied.map(SessionId::parse) {
            Some(Ok(id)) => {
                self.touch(&id).await;
                id
            },
            Some(Err(e)) => {
                debug!(error = %e, "ignoring unusable session id");
                self.allocate().await
            },
            None => self.allocate().await,
        }
    }

    /// Record a request against `id`, creating the entry if needed.
    pub async fn touch(&self, id: &SessionId) {
        let now = now_ms();
        let mut entries = self.entries.write().await;
        let entry = entries.entry(id.clone()).or_insert_with(|| SessionEntry {
            id: id.clone(),
            created_at: now,
            updated_at: now,
            request_count: 0,
        });
        entry.updated_at = now;
        entry.request_count = entry.request_count.saturating_add(1);
        trace!(session = %id, requests = entry.request_count, "session touched");
    }

    #[cfg(test)]
    async fn get(&self, id: &SessionId) -> Option<SessionEntry> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Forget sessions idle for longer than `max_idle`. Returns how many went.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let cutoff = now_ms().saturating_sub(max_idle.as_millis() as u64);
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.updated_at >= cutoff);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "pruned idle sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn allocate_records_distinct_sessions() {
        let registry = SessionRegistry::new();
        let a = registry.allocate().await;
        let b = registry.allocate().await;
        assert_ne!(a, b);
        assert_eq!(registry.count().await, 2);
        assert_eq!(registry.get(&a).await.unwrap().request_count, 0);
    }

    #[tokio::test]
    async fn supplied_session_is_reused() {
        let registry = SessionRegistry::new();
        let first = registry.resolve_or_allocate(Some("client-42")).await;
        let second = registry.resolve_or_allocate(Some("client-42")).await;
        assert_eq!(first.as_str(), "client-42");
        assert_eq!(first, second);
        assert_eq!(registry.count().await, 1);
        assert_eq!(registry.get(&first).await.unwrap().request_count, 2);
    }

    #[tokio::test]
    async fn missing_or_unusable_session_allocates() {
        let registry = SessionRegistry::new();
        let a = registry.resolve_or_allocate(None).await;
        let b = registry.resolve_or_allocate(Some("")).await;
        let c = registry.resolve_or_allocate(Some("x||y")).await;
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(registry.count().await, 3);
    }

    #[tokio::test]
    async fn concurrent_allocations_do_not_collide() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.allocate().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.count().await, 32);
    }

    #[tokio::test]
    async fn prune_keeps_recent_sessions() {
        let registry = SessionRegistry::new();
        let id = registry.allocate().await;
        assert_eq!(registry.prune_idle(Duration::from_secs(60)).await, 0);
        assert!(registry.get(&id).await.is_some());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.prune_idle(Duration::from_millis(5)).await, 1);
        assert_eq!(registry.count().await, 0);
    }
}
