use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

/// Maps a durable user identity to its current connection id,
/// independent of room membership. The most recent mapping wins, so a
/// reconnecting user overwrites its stale entry.
pub struct PresenceDirectory {
    entries: RwLock<HashMap<String, String>>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set(&self, user_id: String, conn_id: String) {
        debug!("Mapping identity {} to connection {}", user_id, conn_id);
        self.entries.write().await.insert(user_id, conn_id);
    }

    pub async fn get(&self, user_id: &str) -> Option<String> {
        self.entries.read().await.get(user_id).cloned()
    }

    /// Evict the entry pointing at this connection, if any, and return
    /// the user id it belonged to. Reverse lookup for disconnect cleanup.
    pub async fn remove_by_connection(&self, conn_id: &str) -> Option<String> {
        let mut entries = self.entries.write().await;
        let user_id = entries
            .iter()
            .find(|(_, conn)| conn.as_str() == conn_id)
            .map(|(user, _)| user.clone())?;
        entries.remove(&user_id);
        Some(user_id)
    }

    pub async fn count(&self) -> u32 {
        self.entries.read().await.len() as u32
    }
}

impl Default for PresenceDirectory {
    fn default() -> Self {
        Self::new()
    }
}
