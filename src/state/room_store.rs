use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::models::{Member, Room, RoomDocument};

struct RoomEntry {
    room: Room,
    /// Set under the room lock when the last member is removed; a handle
    /// carrying this flag is already unlinked (or about to be) and must
    /// be treated as absent.
    defunct: bool,
}

/// Authoritative registry of rooms and their membership.
///
/// The outer map lock is only ever held to clone, insert or remove a
/// per-room handle; all reads and mutations of one room go through that
/// room's own mutex, so same-room operations are linearized while
/// different rooms proceed in parallel. No I/O happens under either lock.
pub struct RoomStore {
    rooms: RwLock<HashMap<String, Arc<Mutex<RoomEntry>>>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    async fn handle(&self, id: &str) -> Option<Arc<Mutex<RoomEntry>>> {
        self.rooms.read().await.get(id).cloned()
    }

    /// Remove the map entry for `id`, but only if it still points at
    /// `handle`; a concurrent create may already have replaced it.
    async fn unlink(&self, id: &str, handle: &Arc<Mutex<RoomEntry>>) {
        let mut map = self.rooms.write().await;
        if let Some(current) = map.get(id) {
            if Arc::ptr_eq(current, handle) {
                map.remove(id);
            }
        }
    }

    /// Create a room with the given initial document. A no-op if the
    /// room already exists: the creator's document wins, later joiners'
    /// values are ignored.
    pub async fn create_if_absent(&self, id: &str, name: &str, initial_doc: RoomDocument) {
        loop {
            if let Some(handle) = self.handle(id).await {
                let entry = handle.lock().await;
                if !entry.defunct {
                    debug!("Room {} already exists", id);
                    return;
                }
                drop(entry);
                // Stale handle from a concurrent delete; clear it and retry.
                self.unlink(id, &handle).await;
                continue;
            }

            let mut map = self.rooms.write().await;
            if map.contains_key(id) {
                // Lost a create race; re-check the winner's entry.
                continue;
            }
            info!("Creating room {} with name {}", id, name);
            map.insert(
                id.to_string(),
                Arc::new(Mutex::new(RoomEntry {
                    room: Room {
                        id: id.to_string(),
                        name: name.to_string(),
                        document: initial_doc,
                        members: Vec::new(),
                    },
                    defunct: false,
                })),
            );
            return;
        }
    }

    /// Snapshot of a room, or `None` if it does not exist.
    pub async fn get(&self, id: &str) -> Option<Room> {
        let handle = self.handle(id).await?;
        let entry = handle.lock().await;
        if entry.defunct {
            None
        } else {
            Some(entry.room.clone())
        }
    }

    pub async fn delete(&self, id: &str) {
        if let Some(handle) = self.handle(id).await {
            let mut entry = handle.lock().await;
            entry.defunct = true;
            drop(entry);
            self.unlink(id, &handle).await;
            info!("Deleted room {}", id);
        }
    }

    /// Add a member to a room. Idempotent: a member id already present
    /// is left untouched. Returns whether the member was newly added.
    pub async fn add_member(&self, id: &str, member: Member) -> bool {
        let Some(handle) = self.handle(id).await else {
            warn!("Room {} does not exist, cannot add member {}", id, member.id);
            return false;
        };
        let mut entry = handle.lock().await;
        if entry.defunct {
            warn!("Room {} does not exist, cannot add member {}", id, member.id);
            return false;
        }
        if entry.room.members.iter().any(|m| m.id == member.id) {
            debug!("Member {} already in room {}", member.id, id);
            return false;
        }
        entry.room.members.push(member);
        debug!("Room {} now has {} members", id, entry.room.members.len());
        true
    }

    /// Remove a member, returning its display name, and delete the room
    /// if that removal emptied it. `None` when the room or member was
    /// already gone, so a leave racing a disconnect resolves to exactly
    /// one effective removal.
    pub async fn remove_member(&self, id: &str, member_id: &str) -> Option<String> {
        let handle = self.handle(id).await?;
        let mut entry = handle.lock().await;
        if entry.defunct {
            return None;
        }
        let idx = entry.room.members.iter().position(|m| m.id == member_id)?;
        let removed = entry.room.members.remove(idx);
        if entry.room.members.is_empty() {
            entry.defunct = true;
            drop(entry);
            self.unlink(id, &handle).await;
            info!("Room {} is empty, deleting", id);
        }
        Some(removed.name)
    }

    /// Run `f` against the room under its lock. `f` must not block.
    pub async fn with_room_mut<R>(&self, id: &str, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        let handle = self.handle(id).await?;
        let mut entry = handle.lock().await;
        if entry.defunct {
            return None;
        }
        Some(f(&mut entry.room))
    }

    pub async fn update_document_text(&self, id: &str, new_text: String) -> bool {
        self.with_room_mut(id, |room| room.document.code = new_text)
            .await
            .is_some()
    }

    /// Overwrite the document metadata. Every field is written as given:
    /// an empty string is an intentional overwrite, not "leave unchanged".
    pub async fn update_document_meta(
        &self,
        id: &str,
        input: String,
        output: String,
        language: String,
    ) -> bool {
        self.with_room_mut(id, |room| {
            room.document.input = input;
            room.document.output = output;
            room.document.language = language;
        })
        .await
        .is_some()
    }

    /// Which room, if any, holds this connection as a member. Used by
    /// disconnect cleanup, which has no room id of its own.
    pub async fn find_room_of_connection(&self, conn_id: &str) -> Option<String> {
        let handles: Vec<(String, Arc<Mutex<RoomEntry>>)> = {
            let map = self.rooms.read().await;
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        for (id, handle) in handles {
            let entry = handle.lock().await;
            if !entry.defunct && entry.room.members.iter().any(|m| m.id == conn_id) {
                return Some(id);
            }
        }
        None
    }

    pub async fn room_ids(&self) -> Vec<String> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// (room count, total member count) for diagnostics.
    pub async fn stats(&self) -> (u32, u32) {
        let handles: Vec<Arc<Mutex<RoomEntry>>> =
            self.rooms.read().await.values().cloned().collect();
        let mut rooms = 0;
        let mut members = 0;
        for handle in handles {
            let entry = handle.lock().await;
            if !entry.defunct {
                rooms += 1;
                members += entry.room.members.len() as u32;
            }
        }
        (rooms, members)
    }

    /// Log every room and its members, the debug-dump listing.
    pub async fn log_rooms(&self) {
        let handles: Vec<(String, Arc<Mutex<RoomEntry>>)> = {
            let map = self.rooms.read().await;
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        info!("=== ALL ROOMS ===");
        for (id, handle) in handles {
            let entry = handle.lock().await;
            if entry.defunct {
                continue;
            }
            info!(
                "Room: {} - {} - Members: {}",
                id,
                entry.room.name,
                entry.room.members.len()
            );
            for member in &entry.room.members {
                info!("  - {} ({})", member.name, member.id);
            }
        }
        info!("=================");
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, name: &str) -> Member {
        Member {
            id: id.to_string(),
            name: name.to_string(),
            avatar: String::new(),
        }
    }

    fn doc(code: &str) -> RoomDocument {
        RoomDocument {
            code: code.to_string(),
            language: "python".to_string(),
            input: String::new(),
            output: String::new(),
        }
    }

    #[tokio::test]
    async fn creator_document_wins_over_later_joiners() {
        let store = RoomStore::new();
        store.create_if_absent("r1", "First", doc("original")).await;
        store.create_if_absent("r1", "Second", doc("other")).await;

        let room = store.get("r1").await.unwrap();
        assert_eq!(room.name, "First");
        assert_eq!(room.document.code, "original");
    }

    #[tokio::test]
    async fn add_member_is_idempotent_by_id() {
        let store = RoomStore::new();
        store.create_if_absent("r1", "R", doc("")).await;
        assert!(store.add_member("r1", member("c1", "Alice")).await);
        assert!(!store.add_member("r1", member("c1", "Alice")).await);
        assert_eq!(store.get("r1").await.unwrap().members.len(), 1);
    }

    #[tokio::test]
    async fn removing_last_member_deletes_the_room() {
        let store = RoomStore::new();
        store.create_if_absent("r1", "R", doc("")).await;
        store.add_member("r1", member("c1", "Alice")).await;
        store.add_member("r1", member("c2", "Bob")).await;

        assert_eq!(
            store.remove_member("r1", "c1").await.as_deref(),
            Some("Alice")
        );
        assert!(store.get("r1").await.is_some());

        assert_eq!(store.remove_member("r1", "c2").await.as_deref(), Some("Bob"));
        assert!(store.get("r1").await.is_none());
        assert!(store.room_ids().await.is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = RoomStore::new();
        store.create_if_absent("r1", "R", doc("")).await;
        store.add_member("r1", member("c1", "Alice")).await;
        store.add_member("r1", member("c2", "Bob")).await;

        assert!(store.remove_member("r1", "c1").await.is_some());
        assert!(store.remove_member("r1", "c1").await.is_none());
        assert!(store.remove_member("missing", "c1").await.is_none());
    }

    #[tokio::test]
    async fn room_can_be_recreated_after_deletion() {
        let store = RoomStore::new();
        store.create_if_absent("r1", "R", doc("v1")).await;
        store.add_member("r1", member("c1", "Alice")).await;
        store.remove_member("r1", "c1").await;
        assert!(store.get("r1").await.is_none());

        store.create_if_absent("r1", "R again", doc("v2")).await;
        let room = store.get("r1").await.unwrap();
        assert_eq!(room.name, "R again");
        assert_eq!(room.document.code, "v2");
        assert!(room.members.is_empty());
    }

    #[tokio::test]
    async fn meta_update_overwrites_with_empty_strings() {
        let store = RoomStore::new();
        store
            .create_if_absent(
                "r1",
                "R",
                RoomDocument {
                    code: "c".to_string(),
                    language: "python".to_string(),
                    input: "stdin".to_string(),
                    output: "stdout".to_string(),
                },
            )
            .await;

        assert!(
            store
                .update_document_meta("r1", String::new(), String::new(), "rust".to_string())
                .await
        );
        let room = store.get("r1").await.unwrap();
        assert_eq!(room.document.input, "");
        assert_eq!(room.document.output, "");
        assert_eq!(room.document.language, "rust");
        // The document text is untouched by metadata updates.
        assert_eq!(room.document.code, "c");
    }

    #[tokio::test]
    async fn text_update_replaces_the_document_text() {
        let store = RoomStore::new();
        store.create_if_absent("r1", "R", doc("old")).await;
        assert!(store.update_document_text("r1", "new".to_string()).await);
        assert_eq!(store.get("r1").await.unwrap().document.code, "new");
        assert!(!store.update_document_text("ghost", "x".to_string()).await);
    }

    #[tokio::test]
    async fn delete_removes_the_room_outright() {
        let store = RoomStore::new();
        store.create_if_absent("r1", "R", doc("")).await;
        store.delete("r1").await;
        assert!(store.get("r1").await.is_none());
        // Deleting an absent room is a no-op.
        store.delete("r1").await;
    }

    #[tokio::test]
    async fn finds_the_room_holding_a_connection() {
        let store = RoomStore::new();
        store.create_if_absent("r1", "R", doc("")).await;
        store.add_member("r1", member("c1", "Alice")).await;

        assert_eq!(
            store.find_room_of_connection("c1").await.as_deref(),
            Some("r1")
        );
        assert!(store.find_room_of_connection("c9").await.is_none());
    }
}
