use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::models::{
    ClientMessage, DebugDump, EngineError, ErrorEvent, JoinAck, JoinRequest, LeftCall,
    MapIdentityRequest, Member, MemberJoined, MemberLeft, MetaRelay, PatchRelay, RoomDocument,
    RoomState, Roster, ServerMessage, UpdateMetaRequest, UpdateRequest,
};
use crate::services::patch_service::{self, PatchOutcome};
use crate::state::AppState;
use crate::ws::signaling;

/// Per-connection protocol context. One exists per live WebSocket; its
/// connection id doubles as the member id inside any room it joins. All
/// document and membership state lives in the shared stores; the
/// context itself holds nothing but its identity.
#[derive(Clone)]
pub struct SessionCtx {
    pub conn_id: String,
    pub state: Arc<AppState>,
}

impl SessionCtx {
    pub fn new(conn_id: String, state: Arc<AppState>) -> Self {
        Self { conn_id, state }
    }

    /// Route one client event to its handler.
    ///
    /// Every handler runs behind the same error boundary: a failure is
    /// logged and reported to this caller only, never broadcast, and the
    /// connection's event loop keeps running.
    pub async fn dispatch(&self, msg: ClientMessage) {
        let result = match msg {
            ClientMessage::Join(req) => self.handle_join(req).await,
            ClientMessage::Leave(t) => self.handle_leave(&t.room_id).await,
            ClientMessage::Update(req) => self.handle_update(req).await,
            ClientMessage::UpdateMeta(req) => self.handle_update_meta(req).await,
            ClientMessage::GetRoomMembers(t) => self.handle_get_room_members(&t.room_id).await,
            ClientMessage::GetRoom(t) => self.handle_get_room(&t.room_id).await,
            ClientMessage::MapIdentity(req) => self.handle_map_identity(req).await,
            ClientMessage::DebugDump(t) => self.handle_debug_dump(&t.room_id).await,
            ClientMessage::RequestJoinPermission(req) => {
                signaling::request_join_permission(self, req).await
            }
            ClientMessage::AcceptPermission(reply) => {
                signaling::accept_permission(self, reply).await
            }
            ClientMessage::RejectPermission(reply) => {
                signaling::reject_permission(self, reply).await
            }
            ClientMessage::DrawRelay(data) => signaling::draw_relay(self, data).await,
            ClientMessage::StartVideo(t) => signaling::start_video(self, &t.room_id).await,
            ClientMessage::SendVideoSignal(req) => signaling::send_video_signal(self, req).await,
            ClientMessage::ReturnVideoSignal(req) => {
                signaling::return_video_signal(self, req).await
            }
            ClientMessage::ToggleVideo(req) => signaling::toggle_video(self, req).await,
            ClientMessage::ToggleAudio(req) => signaling::toggle_audio(self, req).await,
        };

        if let Err(err) = result {
            match &err {
                EngineError::Validation(msg) => {
                    warn!("Rejected event from {}: {}", self.conn_id, msg);
                    self.send_self(ServerMessage::ErrorEvent(ErrorEvent {
                        error: msg.clone(),
                    }))
                    .await;
                }
                EngineError::Internal(msg) => {
                    error!("Handler failed for {}: {}", self.conn_id, msg);
                    self.send_self(ServerMessage::ErrorEvent(ErrorEvent {
                        error: "internal error".to_string(),
                    }))
                    .await;
                }
            }
        }
    }

    pub(crate) async fn send_self(&self, msg: ServerMessage) {
        self.state.registry.send_to(&self.conn_id, msg).await;
    }

    pub(crate) async fn publish(&self, room_id: &str, msg: ServerMessage, exclude: Option<&str>) {
        self.state
            .groups
            .publish(&self.state.registry, room_id, &msg, exclude)
            .await;
    }

    async fn handle_join(&self, req: JoinRequest) -> Result<(), EngineError> {
        if req.display_name.is_empty() {
            return Err(EngineError::Validation("display name is required".into()));
        }

        info!(
            "Join request: {} ({}) joining room {}",
            req.display_name, self.conn_id, req.room_id
        );

        // A reconnecting member only needs its broadcast attachment and a
        // fresh snapshot; re-announcing it would duplicate the original
        // join notifications.
        if let Some(room) = self.state.rooms.get(&req.room_id).await {
            if room.members.iter().any(|m| m.id == self.conn_id) {
                debug!(
                    "Connection {} already in room {}, re-attaching",
                    self.conn_id, req.room_id
                );
                self.state.groups.attach(&req.room_id, &self.conn_id).await;
                self.send_self(ServerMessage::JoinAck(JoinAck {
                    room,
                    connection_id: self.conn_id.clone(),
                }))
                .await;
                return Ok(());
            }
        }

        let initial_doc = RoomDocument {
            code: req.code,
            language: req.language,
            input: req.input,
            output: req.output,
        };
        self.state
            .rooms
            .create_if_absent(&req.room_id, &req.room_name, initial_doc)
            .await;

        let member = Member {
            id: self.conn_id.clone(),
            name: req.display_name,
            avatar: req.avatar,
        };
        self.state
            .rooms
            .add_member(&req.room_id, member.clone())
            .await;
        self.state.groups.attach(&req.room_id, &self.conn_id).await;

        let room = self
            .state
            .rooms
            .get(&req.room_id)
            .await
            .ok_or_else(|| EngineError::Internal(format!("room {} vanished", req.room_id)))?;
        let roster = room.members.clone();

        self.send_self(ServerMessage::JoinAck(JoinAck {
            room,
            connection_id: self.conn_id.clone(),
        }))
        .await;
        self.publish(
            &req.room_id,
            ServerMessage::MemberJoined(MemberJoined { member }),
            Some(&self.conn_id),
        )
        .await;
        // The full roster goes to everyone, joiner included. The overlap
        // with the two events above is what lets a client that missed one
        // of them converge anyway.
        self.publish(
            &req.room_id,
            ServerMessage::Roster(Roster { members: roster }),
            None,
        )
        .await;
        Ok(())
    }

    async fn handle_get_room_members(&self, room_id: &str) -> Result<(), EngineError> {
        let members = match self.state.rooms.get(room_id).await {
            Some(room) => room.members,
            None => Vec::new(),
        };
        self.send_self(ServerMessage::Roster(Roster { members })).await;
        Ok(())
    }

    async fn handle_get_room(&self, room_id: &str) -> Result<(), EngineError> {
        // Full-state broadcast, the recovery path for diverged replicas.
        let room = self.state.rooms.get(room_id).await;
        self.publish(room_id, ServerMessage::RoomState(RoomState { room }), None)
            .await;
        Ok(())
    }

    async fn handle_update(&self, req: UpdateRequest) -> Result<(), EngineError> {
        let outcome =
            patch_service::apply_patch_set(&self.state.rooms, &req.room_id, &req.patch).await;
        if outcome == PatchOutcome::Committed {
            self.publish(
                &req.room_id,
                ServerMessage::PatchRelay(PatchRelay { patch: req.patch }),
                Some(&self.conn_id),
            )
            .await;
        }
        Ok(())
    }

    async fn handle_update_meta(&self, req: UpdateMetaRequest) -> Result<(), EngineError> {
        self.state
            .rooms
            .update_document_meta(
                &req.room_id,
                req.input.clone(),
                req.output.clone(),
                req.language.clone(),
            )
            .await;
        self.publish(
            &req.room_id,
            ServerMessage::MetaRelay(MetaRelay {
                input: req.input,
                output: req.output,
                language: req.language,
            }),
            Some(&self.conn_id),
        )
        .await;
        Ok(())
    }

    async fn handle_leave(&self, room_id: &str) -> Result<(), EngineError> {
        let removed = self.state.rooms.remove_member(room_id, &self.conn_id).await;
        self.state.groups.detach(room_id, &self.conn_id).await;
        if let Some(display_name) = removed {
            info!("{} left room {}", display_name, room_id);
            self.announce_departure(room_id, display_name).await;
        }
        Ok(())
    }

    /// The leave notification pair. Detach precedes this, so the leaver
    /// receives neither event.
    async fn announce_departure(&self, room_id: &str, display_name: String) {
        self.publish(
            room_id,
            ServerMessage::MemberLeft(MemberLeft {
                user_id: self.conn_id.clone(),
                display_name,
            }),
            None,
        )
        .await;
        self.publish(
            room_id,
            ServerMessage::LeftCall(LeftCall {
                user_id: self.conn_id.clone(),
            }),
            None,
        )
        .await;
    }

    async fn handle_map_identity(&self, req: MapIdentityRequest) -> Result<(), EngineError> {
        self.state
            .presence
            .set(req.user_id, self.conn_id.clone())
            .await;
        Ok(())
    }

    async fn handle_debug_dump(&self, room_id: &str) -> Result<(), EngineError> {
        debug!("Debug dump requested for room {}", room_id);
        self.state.rooms.log_rooms().await;
        let room = self.state.rooms.get(room_id).await;
        let all_rooms = self.state.rooms.room_ids().await;
        self.send_self(ServerMessage::DebugDump(DebugDump { room, all_rooms }))
            .await;
        Ok(())
    }

    /// Transport-triggered cleanup when the socket goes away. Commutes
    /// with an explicit leave for the same connection: whichever runs
    /// second finds no member and announces nothing.
    pub async fn disconnect(&self) {
        if let Some(user_id) = self
            .state
            .presence
            .remove_by_connection(&self.conn_id)
            .await
        {
            debug!("Evicted presence entry for {}", user_id);
        }

        let Some(room_id) = self
            .state
            .rooms
            .find_room_of_connection(&self.conn_id)
            .await
        else {
            self.state.groups.detach_all(&self.conn_id).await;
            return;
        };

        let removed = self
            .state
            .rooms
            .remove_member(&room_id, &self.conn_id)
            .await;
        self.state.groups.detach_all(&self.conn_id).await;
        if let Some(display_name) = removed {
            info!(
                "{} disconnected, removed from room {}",
                display_name, room_id
            );
            self.announce_departure(&room_id, display_name).await;
        }
    }
}
