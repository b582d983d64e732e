//! Rolling memory: a fixed-capacity FIFO window of recent turns per session.

use analyst_core::memory::SessionMemory;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

/// Entries kept per session unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 4;

/// An in-process memory that keeps the last `capacity` entries of each session.
///
/// Sessions are created lazily on the first `add` and are never evicted.
/// Cloning shares the underlying store.
#[derive(Clone)]
pub struct RollingMemory {
    capacity: usize,
    sessions: Arc<RwLock<HashMap<String, VecDeque<String>>>>,
}

impl RollingMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of sessions that currently hold at least one entry.
    pub async fn session_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|entries| !entries.is_empty())
            .count()
    }
}

impl Default for RollingMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl SessionMemory for RollingMemory {
    fn name(&self) -> &str {
        "rolling"
    }

    async fn add(&self, session_id: &str, text: String) {
        let mut sessions = self.sessions.write().await;
        let entries = sessions
            .entry(session_id.to_string())
            .or_default();

        entries.push_back(text);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        trace!(session = %session_id, len = entries.len(), "Memory entry added");
    }

    async fn get_recent(&self, session_id: Option<&str>) -> Vec<String> {
        let Some(session_id) = session_id else {
            return Vec::new();
        };
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn clear(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
