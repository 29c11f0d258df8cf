use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc::UnboundedSender, RwLock};
use tracing::debug;

use crate::models::ServerMessage;

/// Outbound channels of all live connections, keyed by connection id.
/// Owned by the transport layer; protocol code addresses peers only
/// through it.
pub struct ConnectionRegistry {
    senders: RwLock<HashMap<String, UnboundedSender<ServerMessage>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, conn_id: String, sender: UnboundedSender<ServerMessage>) {
        self.senders.write().await.insert(conn_id, sender);
    }

    pub async fn unregister(&self, conn_id: &str) {
        self.senders.write().await.remove(conn_id);
    }

    /// Queue a message for one connection. Sending to an unknown or
    /// already-closed connection is a quiet no-op, exactly like emitting
    /// to a gone socket.
    pub async fn send_to(&self, conn_id: &str, msg: ServerMessage) {
        let senders = self.senders.read().await;
        match senders.get(conn_id) {
            Some(sender) => {
                if sender.send(msg).is_err() {
                    debug!("Connection {} is closing, message dropped", conn_id);
                }
            }
            None => debug!("No connection {}, message dropped", conn_id),
        }
    }

    pub async fn count(&self) -> u32 {
        self.senders.read().await.len() as u32
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Room-scoped multicast: which connections are attached to which room.
/// Attachment is a transport concern and tracks membership, but is kept
/// separate from it: a reconnecting member re-attaches without touching
/// the member list.
pub struct BroadcastGroups {
    groups: RwLock<HashMap<String, HashSet<String>>>,
}

impl BroadcastGroups {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    pub async fn attach(&self, room_id: &str, conn_id: &str) {
        self.groups
            .write()
            .await
            .entry(room_id.to_string())
            .or_default()
            .insert(conn_id.to_string());
    }

    pub async fn detach(&self, room_id: &str, conn_id: &str) {
        let mut groups = self.groups.write().await;
        if let Some(members) = groups.get_mut(room_id) {
            members.remove(conn_id);
            if members.is_empty() {
                groups.remove(room_id);
            }
        }
    }

    /// Drop the connection from every group it is attached to.
    pub async fn detach_all(&self, conn_id: &str) {
        let mut groups = self.groups.write().await;
        groups.retain(|_, members| {
            members.remove(conn_id);
            !members.is_empty()
        });
    }

    /// Fan a message out to every connection attached to the room,
    /// optionally excluding one (usually the sender). The group lock is
    /// released before any send.
    pub async fn publish(
        &self,
        registry: &ConnectionRegistry,
        room_id: &str,
        msg: &ServerMessage,
        exclude: Option<&str>,
    ) {
        let targets: Vec<String> = {
            let groups = self.groups.read().await;
            match groups.get(room_id) {
                Some(members) => members
                    .iter()
                    .filter(|id| Some(id.as_str()) != exclude)
                    .cloned()
                    .collect(),
                None => return,
            }
        };
        for target in targets {
            registry.send_to(&target, msg.clone()).await;
        }
    }
}

impl Default for BroadcastGroups {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorEvent, ServerMessage};
    use tokio::sync::mpsc;

    fn probe() -> ServerMessage {
        ServerMessage::ErrorEvent(ErrorEvent {
            error: "probe".to_string(),
        })
    }

    #[tokio::test]
    async fn publish_excludes_the_sender() {
        let registry = ConnectionRegistry::new();
        let groups = BroadcastGroups::new();

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.register("a".into(), tx_a).await;
        registry.register("b".into(), tx_b).await;
        groups.attach("r1", "a").await;
        groups.attach("r1", "b").await;

        groups.publish(&registry, "r1", &probe(), Some("a")).await;
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn publish_to_unknown_room_is_a_no_op() {
        let registry = ConnectionRegistry::new();
        let groups = BroadcastGroups::new();
        groups.publish(&registry, "ghost", &probe(), None).await;
    }

    #[tokio::test]
    async fn detach_all_removes_the_connection_everywhere() {
        let registry = ConnectionRegistry::new();
        let groups = BroadcastGroups::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("a".into(), tx).await;
        groups.attach("r1", "a").await;
        groups.attach("r2", "a").await;

        groups.detach_all("a").await;
        groups.publish(&registry, "r1", &probe(), None).await;
        groups.publish(&registry, "r2", &probe(), None).await;
        assert!(rx.try_recv().is_err());
    }
}
