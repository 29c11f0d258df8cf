//! Stateless relays: video negotiation, A/V toggles, drawing data and
//! the owner-gated join-permission handshake. Nothing here touches room
//! or document state beyond read-only roster lookups.

use tracing::{debug, warn};

use crate::models::{
    AllPeers, DrawData, EngineError, FinalVideoSignal, IncomingVideoSignal, JoinPermissionRequest,
    PermissionReply, PermissionRequested, ServerMessage, ToggleEvent, ToggleRequest,
    VideoSignalRequest, VideoSignalReturn,
};
use crate::ws::session::SessionCtx;

/// Reply with every room member except the caller, the peer list a
/// client dials when it starts its video call.
pub async fn start_video(ctx: &SessionCtx, room_id: &str) -> Result<(), EngineError> {
    let peers = match ctx.state.rooms.get(room_id).await {
        Some(room) => room
            .members
            .into_iter()
            .filter(|m| m.id != ctx.conn_id)
            .collect(),
        None => Vec::new(),
    };
    ctx.send_self(ServerMessage::AllPeers(AllPeers { peers }))
        .await;
    Ok(())
}

pub async fn send_video_signal(
    ctx: &SessionCtx,
    req: VideoSignalRequest,
) -> Result<(), EngineError> {
    ctx.state
        .registry
        .send_to(
            &req.target_id,
            ServerMessage::IncomingVideoSignal(IncomingVideoSignal {
                signal: req.signal,
                caller_id: req.caller_id,
                sender_info: req.sender_info,
            }),
        )
        .await;
    Ok(())
}

pub async fn return_video_signal(
    ctx: &SessionCtx,
    req: VideoSignalReturn,
) -> Result<(), EngineError> {
    ctx.state
        .registry
        .send_to(
            &req.caller_id,
            ServerMessage::FinalVideoSignal(FinalVideoSignal {
                signal: req.signal,
                id: ctx.conn_id.clone(),
            }),
        )
        .await;
    Ok(())
}

pub async fn toggle_video(ctx: &SessionCtx, req: ToggleRequest) -> Result<(), EngineError> {
    ctx.publish(
        &req.room_id,
        ServerMessage::ToggleVideo(ToggleEvent {
            user_id: req.user_id,
        }),
        Some(&ctx.conn_id),
    )
    .await;
    Ok(())
}

pub async fn toggle_audio(ctx: &SessionCtx, req: ToggleRequest) -> Result<(), EngineError> {
    ctx.publish(
        &req.room_id,
        ServerMessage::ToggleAudio(ToggleEvent {
            user_id: req.user_id,
        }),
        Some(&ctx.conn_id),
    )
    .await;
    Ok(())
}

pub async fn draw_relay(ctx: &SessionCtx, data: DrawData) -> Result<(), EngineError> {
    let room_id = data.room_id.clone();
    ctx.publish(&room_id, ServerMessage::DrawRelay(data), Some(&ctx.conn_id))
        .await;
    Ok(())
}

/// Route a join request to the room owner's *current* connection. The
/// owner is addressed by durable identity through the presence
/// directory, since it may have reconnected since creating the room;
/// the requester's connection id is captured into the request so the
/// decision can find its way back.
pub async fn request_join_permission(
    ctx: &SessionCtx,
    req: JoinPermissionRequest,
) -> Result<(), EngineError> {
    let Some(owner_conn) = ctx.state.presence.get(&req.room.owner).await else {
        warn!(
            "No connection mapped for room owner {}, permission request dropped",
            req.room.owner
        );
        return Ok(());
    };
    debug!(
        "Routing permission request from {} to owner connection {}",
        ctx.conn_id, owner_conn
    );
    ctx.state
        .registry
        .send_to(
            &owner_conn,
            ServerMessage::PermissionRequest(PermissionRequested {
                room: req.room,
                user: req.user,
                sender_id: ctx.conn_id.clone(),
            }),
        )
        .await;
    Ok(())
}

/// Decisions go back over the requester's connection id exactly as
/// captured at request time, not re-resolved through the presence
/// directory. A requester that reconnected mid-handshake simply misses
/// the reply and asks again.
pub async fn accept_permission(ctx: &SessionCtx, reply: PermissionReply) -> Result<(), EngineError> {
    ctx.state
        .registry
        .send_to(&reply.sender_id, ServerMessage::PermissionAccepted)
        .await;
    Ok(())
}

pub async fn reject_permission(ctx: &SessionCtx, reply: PermissionReply) -> Result<(), EngineError> {
    ctx.state
        .registry
        .send_to(&reply.sender_id, ServerMessage::PermissionRejected)
        .await;
    Ok(())
}
