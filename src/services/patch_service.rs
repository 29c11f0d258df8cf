use tracing::{debug, warn};

use crate::models::patch::{self, PatchHunk};
use crate::state::RoomStore;

/// What became of a patch set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Every hunk applied; the room's document now carries the new text
    /// and the set should be relayed to the other members.
    Committed,
    /// At least one hunk failed to apply (or the set was empty). The
    /// document is unchanged and nothing is relayed.
    Rejected,
    /// No such room.
    RoomMissing,
}

/// Apply a patch set to a room's authoritative document.
///
/// Commit policy: all hunks of a non-empty set must apply. Read, apply
/// and commit happen under the room's lock, so the stored text only ever
/// reflects a fully applied set. The application itself is pure in-memory
/// work, nothing blocks under the lock.
///
/// There is no operational transform here: two members patching from a
/// stale base can diverge, and a failed set is dropped silently. Clients
/// recover by fetching the full room state.
pub async fn apply_patch_set(
    rooms: &RoomStore,
    room_id: &str,
    hunks: &[PatchHunk],
) -> PatchOutcome {
    let committed = rooms
        .with_room_mut(room_id, |room| {
            let outcome = patch::apply_hunks(&room.document.code, hunks);
            if outcome.all_applied() {
                room.document.code = outcome.text;
                true
            } else {
                false
            }
        })
        .await;

    match committed {
        None => {
            debug!("Patch for unknown room {} dropped", room_id);
            PatchOutcome::RoomMissing
        }
        Some(true) => PatchOutcome::Committed,
        Some(false) => {
            warn!("Patch for room {} failed to apply, dropped", room_id);
            PatchOutcome::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{patch::DIFF_EQUAL, patch::DIFF_INSERT, RoomDocument};

    fn insert_hunk(text: &str) -> PatchHunk {
        PatchHunk {
            diffs: vec![(DIFF_INSERT, text.to_string())],
            start1: 0,
            start2: 0,
            length1: 0,
            length2: text.chars().count(),
        }
    }

    async fn store_with_room(code: &str) -> RoomStore {
        let store = RoomStore::new();
        store
            .create_if_absent(
                "r1",
                "R",
                RoomDocument {
                    code: code.to_string(),
                    ..Default::default()
                },
            )
            .await;
        store
    }

    #[tokio::test]
    async fn committing_set_updates_the_document() {
        let store = store_with_room("").await;
        let outcome = apply_patch_set(&store, "r1", &[insert_hunk("print(1)")]).await;
        assert_eq!(outcome, PatchOutcome::Committed);
        assert_eq!(store.get("r1").await.unwrap().document.code, "print(1)");
    }

    #[tokio::test]
    async fn one_failing_hunk_rejects_the_whole_set() {
        let store = store_with_room("base text").await;
        let good = insert_hunk("x");
        let bad = PatchHunk {
            diffs: vec![
                (DIFF_EQUAL, "no such context".to_string()),
                (DIFF_INSERT, "y".to_string()),
            ],
            start1: 0,
            start2: 0,
            length1: 14,
            length2: 15,
        };
        let outcome = apply_patch_set(&store, "r1", &[good, bad]).await;
        assert_eq!(outcome, PatchOutcome::Rejected);
        assert_eq!(store.get("r1").await.unwrap().document.code, "base text");
    }

    #[tokio::test]
    async fn empty_set_is_rejected() {
        let store = store_with_room("base").await;
        assert_eq!(
            apply_patch_set(&store, "r1", &[]).await,
            PatchOutcome::Rejected
        );
        assert_eq!(store.get("r1").await.unwrap().document.code, "base");
    }

    #[tokio::test]
    async fn missing_room_is_reported_not_created() {
        let store = RoomStore::new();
        assert_eq!(
            apply_patch_set(&store, "nope", &[insert_hunk("x")]).await,
            PatchOutcome::RoomMissing
        );
        assert!(store.get("nope").await.is_none());
    }
}
